// Copyright (c) 2023 Huawei Device Co., Ltd.
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use ylong_spdy_mux::transport::{self, Peer};
use ylong_spdy_mux::{ConnHandle, Connection, Frame, MuxError, Payload, Service, SpdyConfig};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// A served connection and the peer talking to it.
pub struct Server {
    pub task: JoinHandle<Result<(), MuxError>>,
    pub handle: ConnHandle,
    pub peer: Peer,
}

/// Serves a connection over an in-memory transport.
pub fn start<S: Service>(config: SpdyConfig, service: S) -> Server {
    let (reader, writer, peer) = transport::channel();
    let connection = Connection::new(config, reader, writer, service);
    let handle = connection.handle();
    let task = tokio::spawn(connection.serve());
    Server { task, handle, peer }
}

impl Server {
    /// Receives the next frame written by the connection.
    pub async fn recv(&mut self) -> Frame {
        timeout(TIMEOUT, self.peer.recv())
            .await
            .expect("Receive frame timed out")
            .expect("Transport closed")
    }

    /// Receives the SETTINGS every connection starts with.
    pub async fn recv_settings(&mut self) {
        let frame = self.recv().await;
        assert!(
            matches!(frame.payload(), Payload::Settings(_)),
            "Assert settings failed"
        );
    }

    /// Receives the remaining frames until the connection closes the
    /// transport.
    pub async fn recv_to_end(&mut self) -> Vec<Frame> {
        let mut frames = vec![];
        while let Some(frame) = timeout(TIMEOUT, self.peer.recv())
            .await
            .expect("Receive frame timed out")
        {
            frames.push(frame);
        }
        frames
    }

    /// Waits for `Connection::serve` to return.
    pub async fn finish(self) -> Result<(), MuxError> {
        timeout(TIMEOUT, self.task)
            .await
            .expect("Serve timed out")
            .expect("Serve task failed")
    }
}
