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

//! Frame send coroutine.

use tracing::{debug, warn};
use ylong_spdy::Frame;

use crate::dispatcher::{DispatchErrorKind, OutputMessage};
use crate::runtime::{UnboundedReceiver, UnboundedSender};
use crate::transport::FrameWrite;

pub(crate) struct SendData<W> {
    writer: W,
    input_rx: UnboundedReceiver<Frame>,
    // Reports write failures to the manager.
    resp_tx: UnboundedSender<OutputMessage>,
}

impl<W: FrameWrite> SendData<W> {
    pub(crate) fn new(
        writer: W,
        input_rx: UnboundedReceiver<Frame>,
        resp_tx: UnboundedSender<OutputMessage>,
    ) -> Self {
        Self {
            writer,
            input_rx,
            resp_tx,
        }
    }

    /// Writes frames in submission order until the manager drops its
    /// sender, then closes the transport.
    pub(crate) async fn run(mut self) {
        while let Some(frame) = self.input_rx.recv().await {
            if let Err(e) = self.writer.write_frame(frame).await {
                warn!(error = %e, "spdy frame write failed");
                // The manager may already be gone.
                let _ = self
                    .resp_tx
                    .send(OutputMessage::OutputExit(DispatchErrorKind::Io(e.kind())));
                return;
            }
        }
        if let Err(e) = self.writer.close().await {
            debug!(error = %e, "spdy transport close failed");
        }
    }
}

#[cfg(test)]
mod ut_input {
    use ylong_spdy::Frame;

    use crate::dispatcher::{DispatchErrorKind, OutputMessage};
    use crate::mux::input::SendData;
    use crate::runtime::unbounded_channel;
    use crate::transport::channel;

    /// UT test cases for `SendData::run`.
    ///
    /// # Brief
    /// 1. Queues frames and drops the sender.
    /// 2. Checks that the frames are written in order and the transport is
    ///    closed.
    #[tokio::test]
    async fn ut_send_data_order() {
        let (_reader, writer, mut peer) = channel();
        let (input_tx, input_rx) = unbounded_channel();
        let (resp_tx, _resp_rx) = unbounded_channel();
        for id in 1..=3 {
            input_tx.send(Frame::ping(id)).unwrap();
        }
        drop(input_tx);
        SendData::new(writer, input_rx, resp_tx).run().await;
        for id in 1..=3 {
            let frame = peer.recv().await.unwrap();
            match frame.payload() {
                ylong_spdy::Payload::Ping(ping) => assert_eq!(ping.id(), id),
                _ => panic!("unexpected payload"),
            }
        }
        assert!(peer.recv().await.is_none());
    }

    /// UT test cases for `SendData::run` write failures.
    ///
    /// # Brief
    /// 1. Writes a frame to a transport whose peer stopped reading.
    /// 2. Checks that the failure is reported to the manager.
    #[tokio::test]
    async fn ut_send_data_write_error() {
        let (_reader, writer, mut peer) = channel();
        peer.close_read();
        let (input_tx, input_rx) = unbounded_channel();
        let (resp_tx, mut resp_rx) = unbounded_channel();
        input_tx.send(Frame::ping(1)).unwrap();
        SendData::new(writer, input_rx, resp_tx).run().await;
        match resp_rx.recv().await {
            Some(OutputMessage::OutputExit(DispatchErrorKind::Io(kind))) => {
                assert_eq!(kind, std::io::ErrorKind::BrokenPipe)
            }
            _ => panic!("expected a write failure"),
        }
    }
}
