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

//! SPDY connection dispatcher.
//!
//! A served connection runs three cooperating tasks joined by channels:
//!
//! - `RecvData` reads frames from the transport and forwards them.
//! - `ConnManager` owns every stream and window and decides what to send.
//! - `SendData` writes frames to the transport in submission order.
//!
//! Services run on tasks of their own and reach the manager only through
//! [`ReqMessage`]s.

use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};
use ylong_spdy::frame::{Goaway, DEFAULT_WINDOW_SIZE};
use ylong_spdy::{Frame, GoAwayStatus, SettingId, Settings, SpdyError, StreamId};

use crate::mux::{ConnManager, FlowControl, RecvData, SendData, Streams};
use crate::runtime::{oneshot, spawn, unbounded_channel, UnboundedReceiver, UnboundedSender};
use crate::service::{PushPromise, Response, Service};
use crate::transport::{FrameRead, FrameWrite};
use crate::{ErrorKind, MuxError, SpdyConfig};

pub(crate) enum ReqMessage {
    // A service finished handling the request of stream `id`.
    Response {
        id: StreamId,
        response: Result<Response, MuxError>,
    },
    // The application consumed `size` bytes of a request body.
    Consumed {
        id: StreamId,
        size: u32,
    },
    Push {
        associated: StreamId,
        promise: PushPromise,
        response: Response,
        tx: oneshot::Sender<Result<StreamId, MuxError>>,
    },
    Shutdown,
}

pub(crate) enum OutputMessage {
    Output(Frame),
    OutputExit(DispatchErrorKind),
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub(crate) enum DispatchErrorKind {
    Spdy(SpdyError),
    Io(std::io::ErrorKind),
    ChannelClosed,
    Disconnect,
}

pub(crate) struct StreamController {
    // Stream information on the connection.
    pub(crate) streams: Streams,
    // Status of the GOAWAY frame received from the peer.
    pub(crate) go_away: Option<GoAwayStatus>,
    // The connection admits no new streams once closing.
    pub(crate) closing: bool,
    // The GOAWAY frame sent to the peer.
    pub(crate) go_away_sync: GoAwaySync,
    pub(crate) torn_down: bool,
}

#[derive(Default)]
pub(crate) struct GoAwaySync {
    pub(crate) going_away: Option<Goaway>,
}

/// A SPDY connection serving the streams opened by its peer.
///
/// # Examples
///
/// ```no_run
/// use ylong_spdy_mux::{service_fn, transport, Connection, MuxError, Response, SpdyConfig};
///
/// # async fn serve() -> Result<(), MuxError> {
/// let (reader, writer, _peer) = transport::channel();
/// let service = service_fn(|_request| async {
///     Ok::<_, MuxError>(Response::new(200).body("hello"))
/// });
/// let connection = Connection::new(SpdyConfig::default(), reader, writer, service);
/// let handle = connection.handle();
/// # handle.shutdown();
/// connection.serve().await
/// # }
/// ```
pub struct Connection<R, W, S> {
    config: SpdyConfig,
    reader: R,
    writer: W,
    service: Arc<S>,
    req_tx: UnboundedSender<ReqMessage>,
    req_rx: UnboundedReceiver<ReqMessage>,
}

/// Controls a [`Connection`] from outside of it.
#[derive(Clone)]
pub struct ConnHandle {
    sender: UnboundedSender<ReqMessage>,
}

impl<R, W, S> Connection<R, W, S>
where
    R: FrameRead,
    W: FrameWrite,
    S: Service,
{
    /// `Connection` constructor.
    pub fn new(config: SpdyConfig, reader: R, writer: W, service: S) -> Self {
        let (req_tx, req_rx) = unbounded_channel();
        Self {
            config,
            reader,
            writer,
            service: Arc::new(service),
            req_tx,
            req_rx,
        }
    }

    /// Gets a handle of the connection.
    pub fn handle(&self) -> ConnHandle {
        ConnHandle {
            sender: self.req_tx.clone(),
        }
    }

    /// Serves the connection until it is closed.
    ///
    /// Returns `Ok` when the connection was shut down in an orderly way or
    /// the peer closed the transport, and the fault otherwise.
    pub async fn serve(self) -> Result<(), MuxError> {
        let Connection {
            config,
            reader,
            writer,
            service,
            req_tx,
            req_rx,
        } = self;

        let (input_tx, input_rx) = unbounded_channel();
        let (resp_tx, resp_rx) = unbounded_channel();

        let flow = FlowControl::new(DEFAULT_WINDOW_SIZE, DEFAULT_WINDOW_SIZE);
        let streams = Streams::new(&config, flow);
        let controller = StreamController::new(streams);

        let send = SendData::new(writer, input_rx, resp_tx.clone());
        let send_handle = spawn(send.run());
        let recv = RecvData::new(reader, resp_tx);
        let recv_handle = spawn(recv.run());

        let mut manager = ConnManager::new(
            config, input_tx, resp_rx, req_tx, req_rx, controller, service,
        );
        let result = match manager.start() {
            Ok(()) => Pin::new(&mut manager).await,
            Err(e) => {
                manager.exit_with_error(e.clone());
                Err(e)
            }
        };
        // Dropping the manager releases the writer, which flushes and closes
        // the transport.
        drop(manager);
        if let Err(e) = send_handle.await {
            warn!(error = %e, "spdy writer task failed");
        }
        recv_handle.abort();

        match result {
            Ok(()) => Ok(()),
            Err(DispatchErrorKind::Disconnect) => {
                debug!("spdy connection closed by peer");
                Ok(())
            }
            Err(e) => Err(dispatch_mux_error(&e)),
        }
    }
}

impl ConnHandle {
    /// Starts an orderly shutdown.
    ///
    /// The connection sends GOAWAY, refuses new streams and closes once the
    /// open streams are finished.
    pub fn shutdown(&self) {
        // The connection may already be gone.
        let _ = self.sender.send(ReqMessage::Shutdown);
    }

    /// Whether the connection has stopped serving.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl StreamController {
    pub(crate) fn new(streams: Streams) -> Self {
        Self {
            streams,
            go_away: None,
            closing: false,
            go_away_sync: GoAwaySync::default(),
            torn_down: false,
        }
    }

    pub(crate) fn shutdown(&mut self) {
        self.closing = true;
    }
}

pub(crate) fn create_initial_settings(config: &SpdyConfig) -> Frame {
    let mut settings = Settings::new().with(
        SettingId::InitialWindowSize,
        config.get_stream_window_size() as i32,
    );
    if let Some(num) = config.get_max_concurrent_streams() {
        settings.set(SettingId::MaxConcurrentStreams, num.min(i32::MAX as u32) as i32);
    }
    Frame::settings(settings)
}

impl From<std::io::Error> for DispatchErrorKind {
    fn from(value: std::io::Error) -> Self {
        DispatchErrorKind::Io(value.kind())
    }
}

impl From<SpdyError> for DispatchErrorKind {
    fn from(err: SpdyError) -> Self {
        DispatchErrorKind::Spdy(err)
    }
}

impl DispatchErrorKind {
    /// The GOAWAY status announcing this error to the peer, if any.
    pub(crate) fn go_away_status(&self) -> Option<GoAwayStatus> {
        match self {
            DispatchErrorKind::Spdy(SpdyError::ConnectionError(status)) => Some(*status),
            DispatchErrorKind::Spdy(SpdyError::StreamError(..)) => {
                Some(GoAwayStatus::ProtocolError)
            }
            DispatchErrorKind::Io(_) | DispatchErrorKind::ChannelClosed => {
                Some(GoAwayStatus::InternalError)
            }
            DispatchErrorKind::Disconnect => None,
        }
    }
}

pub(crate) fn dispatch_mux_error(dispatch_error: &DispatchErrorKind) -> MuxError {
    match dispatch_error {
        DispatchErrorKind::Spdy(e) => MuxError::from(e.clone()),
        DispatchErrorKind::Io(e) => {
            MuxError::new_with_cause(ErrorKind::Transport, Some(std::io::Error::from(*e)))
        }
        DispatchErrorKind::ChannelClosed => {
            MuxError::new_with_message(ErrorKind::Closed, "Coroutine channel closed.")
        }
        DispatchErrorKind::Disconnect => {
            MuxError::new_with_message(ErrorKind::Closed, "remote peer closed.")
        }
    }
}

#[cfg(test)]
mod ut_dispatch {
    use std::io;

    use ylong_spdy::{GoAwayStatus, Payload, SettingId, SpdyError};

    use crate::dispatcher::{create_initial_settings, dispatch_mux_error, DispatchErrorKind};
    use crate::{ErrorKind, Role, SpdyConfig};

    /// UT test cases for `create_initial_settings`.
    ///
    /// # Brief
    /// 1. Creates the initial SETTINGS of a configured connection.
    /// 2. Checks the advertised values.
    #[test]
    fn ut_create_initial_settings() {
        let config = SpdyConfig::new(Role::Server)
            .stream_window_size(1024)
            .max_concurrent_streams(Some(8));
        let frame = create_initial_settings(&config);
        assert_eq!(frame.stream_id(), 0);
        match frame.payload() {
            Payload::Settings(settings) => {
                assert_eq!(settings.get(SettingId::InitialWindowSize), Some(1024));
                assert_eq!(settings.get(SettingId::MaxConcurrentStreams), Some(8));
            }
            _ => panic!("unexpected payload"),
        }

        let unbounded = SpdyConfig::new(Role::Server).max_concurrent_streams(None);
        match create_initial_settings(&unbounded).payload() {
            Payload::Settings(settings) => {
                assert_eq!(settings.get(SettingId::MaxConcurrentStreams), None)
            }
            _ => panic!("unexpected payload"),
        }
    }

    /// UT test cases for `DispatchErrorKind` conversions.
    ///
    /// # Brief
    /// 1. Converts dispatch errors into GOAWAY statuses and `MuxError`s.
    /// 2. Checks if the results are correct.
    #[test]
    fn ut_dispatch_error_kind() {
        let protocol = DispatchErrorKind::Spdy(SpdyError::ConnectionError(
            GoAwayStatus::ProtocolError,
        ));
        assert_eq!(protocol.go_away_status(), Some(GoAwayStatus::ProtocolError));
        assert_eq!(dispatch_mux_error(&protocol).error_kind(), ErrorKind::Protocol);

        let io = DispatchErrorKind::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(io.go_away_status(), Some(GoAwayStatus::InternalError));
        assert_eq!(dispatch_mux_error(&io).error_kind(), ErrorKind::Transport);

        assert_eq!(DispatchErrorKind::Disconnect.go_away_status(), None);
        assert_eq!(
            dispatch_mux_error(&DispatchErrorKind::ChannelClosed).error_kind(),
            ErrorKind::Closed
        );
    }
}
