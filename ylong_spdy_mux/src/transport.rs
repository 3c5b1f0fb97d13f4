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

//! Frame transport boundary of a connection.
//!
//! A connection reads and writes decoded [`Frame`]s. Turning bytes into
//! frames is the job of whoever implements [`FrameRead`] and [`FrameWrite`].
//! [`channel`] provides an in-memory implementation.

use std::future::Future;
use std::io;

use ylong_spdy::Frame;

use crate::runtime::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// The inbound half of a transport.
pub trait FrameRead: Send + 'static {
    /// Reads the next frame. `Ok(None)` means the peer closed the transport.
    fn read_frame(&mut self) -> impl Future<Output = io::Result<Option<Frame>>> + Send;
}

/// The outbound half of a transport.
pub trait FrameWrite: Send + 'static {
    /// Writes one frame.
    fn write_frame(&mut self, frame: Frame) -> impl Future<Output = io::Result<()>> + Send;

    /// Flushes pending frames and closes the transport.
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Reading half of an in-memory transport.
pub struct FrameReceiver {
    rx: UnboundedReceiver<io::Result<Frame>>,
}

/// Writing half of an in-memory transport.
pub struct FrameSender {
    tx: Option<UnboundedSender<Frame>>,
}

/// The far end of an in-memory transport.
pub struct Peer {
    tx: Option<UnboundedSender<io::Result<Frame>>>,
    rx: UnboundedReceiver<Frame>,
}

/// Creates an in-memory transport.
///
/// The connection side gets a [`FrameReceiver`] and a [`FrameSender`]; the
/// [`Peer`] plays the remote endpoint.
///
/// # Examples
///
/// ```
/// use ylong_spdy::Frame;
/// use ylong_spdy_mux::transport;
///
/// let (_reader, _writer, peer) = transport::channel();
/// peer.send(Frame::ping(1)).unwrap();
/// ```
pub fn channel() -> (FrameReceiver, FrameSender, Peer) {
    let (in_tx, in_rx) = unbounded_channel();
    let (out_tx, out_rx) = unbounded_channel();
    (
        FrameReceiver { rx: in_rx },
        FrameSender { tx: Some(out_tx) },
        Peer {
            tx: Some(in_tx),
            rx: out_rx,
        },
    )
}

impl FrameRead for FrameReceiver {
    async fn read_frame(&mut self) -> io::Result<Option<Frame>> {
        self.rx.recv().await.transpose()
    }
}

impl FrameWrite for FrameSender {
    async fn write_frame(&mut self, frame: Frame) -> io::Result<()> {
        match self.tx {
            Some(ref tx) => tx.send(frame).map_err(|_| broken_pipe()),
            None => Err(broken_pipe()),
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        self.tx = None;
        Ok(())
    }
}

impl Peer {
    /// Sends a frame to the connection.
    pub fn send(&self, frame: Frame) -> io::Result<()> {
        self.send_result(Ok(frame))
    }

    /// Makes the connection's next read fail with `kind`.
    pub fn send_error(&self, kind: io::ErrorKind) -> io::Result<()> {
        self.send_result(Err(io::Error::from(kind)))
    }

    /// Closes the direction towards the connection, which reads EOF next.
    pub fn close_write(&mut self) {
        self.tx = None;
    }

    /// Receives the next frame written by the connection, or `None` once the
    /// connection closed the transport.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Receives a frame the connection already wrote, without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Stops accepting frames; the connection's next write fails.
    pub fn close_read(&mut self) {
        self.rx.close();
    }

    fn send_result(&self, frame: io::Result<Frame>) -> io::Result<()> {
        match self.tx {
            Some(ref tx) => tx.send(frame).map_err(|_| broken_pipe()),
            None => Err(broken_pipe()),
        }
    }
}

fn broken_pipe() -> io::Error {
    io::Error::from(io::ErrorKind::BrokenPipe)
}

#[cfg(test)]
mod ut_transport {
    use std::io;

    use ylong_spdy::{Frame, Payload};

    use crate::transport::{channel, FrameRead, FrameWrite};

    /// UT test cases for the in-memory transport.
    ///
    /// # Brief
    /// 1. Sends frames in both directions.
    /// 2. Closes both directions.
    /// 3. Checks EOF and broken pipe reporting.
    #[tokio::test]
    async fn ut_transport_channel() {
        let (mut reader, mut writer, mut peer) = channel();
        peer.send(Frame::ping(1)).unwrap();
        let frame = reader.read_frame().await.unwrap().unwrap();
        assert!(matches!(frame.payload(), Payload::Ping(_)));

        writer.write_frame(Frame::ping(2)).await.unwrap();
        assert!(peer.try_recv().is_some());
        assert!(peer.try_recv().is_none());

        peer.send_error(io::ErrorKind::ConnectionReset).unwrap();
        let err = reader.read_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);

        peer.close_write();
        assert!(reader.read_frame().await.unwrap().is_none());
        assert!(peer.send(Frame::ping(3)).is_err());

        writer.close().await.unwrap();
        assert!(peer.recv().await.is_none());
        let err = writer.write_frame(Frame::ping(4)).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
