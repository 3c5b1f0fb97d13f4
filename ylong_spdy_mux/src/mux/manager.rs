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

//! Streams manage coroutine.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tracing::{debug, error, warn};
use ylong_spdy::frame::{
    Goaway, HeaderBlock, Ping, RstStream, StreamId, SynReply, SynStream, WindowUpdate,
};
use ylong_spdy::{ErrorCode, Frame, FrameFlags, GoAwayStatus, Payload, Settings, SpdyError};

use crate::body::RequestBody;
use crate::config::Role;
use crate::dispatcher::{
    create_initial_settings, DispatchErrorKind, OutputMessage, ReqMessage, StreamController,
};
use crate::mux::settings::apply_settings;
use crate::mux::streams::{DataReadState, FrameRecvState, StreamEndState, StreamState};
use crate::runtime::{spawn, JoinError, JoinHandle, UnboundedReceiver, UnboundedSender};
use crate::service::{PushPromise, Pusher, Request, Response, Service};
use crate::{ErrorKind, MuxError, SpdyConfig};

// Version a reply is labelled with when the request carried none.
const DEFAULT_VERSION: &str = "HTTP/1.1";
const PUSH_METHOD: &str = "GET";

// Service task handle, aborting the task when dropped.
struct ServiceTask(JoinHandle<Result<Response, MuxError>>);

impl Future for ServiceTask {
    type Output = Result<Result<Response, MuxError>, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl Drop for ServiceTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub(crate) struct ConnManager<S> {
    config: SpdyConfig,
    // channel transmitter between manager and io input.
    input_tx: Option<UnboundedSender<Frame>>,
    // channel receiver between manager and io output.
    resp_rx: UnboundedReceiver<OutputMessage>,
    // Handed out to request bodies, pushers and service tasks.
    req_tx: UnboundedSender<ReqMessage>,
    req_rx: UnboundedReceiver<ReqMessage>,
    controller: StreamController,
    service: Arc<S>,
}

impl<S: Service> Future for ConnManager<S> {
    type Output = Result<(), DispatchErrorKind>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let manager = self.get_mut();
        match manager.poll_manage(cx) {
            Poll::Ready(Err(e)) => {
                manager.exit_with_error(e.clone());
                Poll::Ready(Err(e))
            }
            other => other,
        }
    }
}

impl<S: Service> ConnManager<S> {
    pub(crate) fn new(
        config: SpdyConfig,
        input_tx: UnboundedSender<Frame>,
        resp_rx: UnboundedReceiver<OutputMessage>,
        req_tx: UnboundedSender<ReqMessage>,
        req_rx: UnboundedReceiver<ReqMessage>,
        controller: StreamController,
        service: Arc<S>,
    ) -> Self {
        Self {
            config,
            input_tx: Some(input_tx),
            resp_rx,
            req_tx,
            req_rx,
            controller,
            service,
        }
    }

    /// Advertises the local settings and the connection receive window.
    pub(crate) fn start(&mut self) -> Result<(), DispatchErrorKind> {
        self.send_frame(create_initial_settings(&self.config))?;
        let size = self.config.get_conn_window_size();
        if let Some(update) = self.controller.streams.setup_conn_recv_window(size) {
            self.send_frame(update)?;
        }
        Ok(())
    }

    fn poll_manage(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), DispatchErrorKind>> {
        loop {
            // Receives a frame from io output.
            match self.resp_rx.poll_recv(cx) {
                Poll::Ready(Some(OutputMessage::Output(frame))) => {
                    self.poll_recv_message(frame)?;
                }
                // io output or input occurs error.
                Poll::Ready(Some(OutputMessage::OutputExit(e))) => {
                    return Poll::Ready(Err(e));
                }
                Poll::Ready(None) => {
                    return Poll::Ready(Err(DispatchErrorKind::ChannelClosed));
                }
                Poll::Pending => {
                    return self.manage_pending_state(cx);
                }
            }
        }
    }

    fn manage_pending_state(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), DispatchErrorKind>> {
        self.poll_recv_request(cx)?;
        self.poll_input_request(cx)?;
        self.window_update()?;
        if self.controller.closing && self.controller.streams.is_empty() {
            self.finish()?;
            return Poll::Ready(Ok(()));
        }
        Poll::Pending
    }

    fn poll_recv_request(&mut self, cx: &mut Context<'_>) -> Result<(), DispatchErrorKind> {
        loop {
            match self.req_rx.poll_recv(cx) {
                Poll::Ready(Some(message)) => self.recv_request_message(message)?,
                Poll::Ready(None) => return Err(DispatchErrorKind::ChannelClosed),
                Poll::Pending => return Ok(()),
            }
        }
    }

    fn recv_request_message(&mut self, message: ReqMessage) -> Result<(), DispatchErrorKind> {
        match message {
            ReqMessage::Response { id, response } => self.recv_response(id, response),
            ReqMessage::Consumed { id, size } => {
                self.controller.streams.release_recv(id, size);
                Ok(())
            }
            ReqMessage::Push {
                associated,
                promise,
                response,
                tx,
            } => {
                let result = self.push_stream(associated, promise, response);
                // The pusher may have given up waiting.
                let _ = tx.send(result);
                Ok(())
            }
            ReqMessage::Shutdown => self.start_shutdown(),
        }
    }

    fn recv_response(
        &mut self,
        id: StreamId,
        response: Result<Response, MuxError>,
    ) -> Result<(), DispatchErrorKind> {
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                debug!(stream_id = id, error = %e, "spdy service failed");
                return self.manage_stream_error(id, ErrorCode::Cancel);
            }
        };
        let version = match self.controller.streams.get(id) {
            // The stream was reset while the service was running.
            None => return Ok(()),
            Some(stream) if stream.version.is_empty() => DEFAULT_VERSION.to_string(),
            Some(stream) => stream.version.clone(),
        };
        let (status, headers, body, trailers) = response.into_parts();
        let mut flags = FrameFlags::empty();
        flags.set_fin(body.is_end_stream() && trailers.is_none());
        let reply = Frame::new(
            id,
            flags,
            Payload::SynReply(SynReply::new(status, &version, headers)),
        );
        self.controller.streams.set_reply(id, reply, body, trailers);
        Ok(())
    }

    fn push_stream(
        &mut self,
        associated: StreamId,
        promise: PushPromise,
        response: Response,
    ) -> Result<StreamId, MuxError> {
        if self.controller.streams.role() != Role::Server {
            return Err(MuxError::new_with_message(
                ErrorKind::Refused,
                "Push Not Allowed !",
            ));
        }
        if self.controller.closing {
            return Err(MuxError::new_with_message(
                ErrorKind::Refused,
                "Connection Going Away !",
            ));
        }
        let version = match self.controller.streams.get(associated) {
            Some(stream) if stream.is_local_open() => stream.version.clone(),
            _ => {
                return Err(MuxError::new_with_message(
                    ErrorKind::Closed,
                    "Associated Stream Closed !",
                ))
            }
        };
        if self.controller.streams.reach_max_concurrency() {
            return Err(MuxError::new_with_message(
                ErrorKind::Refused,
                "Concurrency Limit Reached !",
            ));
        }

        let id = self.controller.streams.generate_local_id()?;
        let (path, scheme, mut headers) = promise.into_parts();
        let (status, response_headers, body, trailers) = response.into_parts();
        for (name, value) in response_headers.iter() {
            headers.append(name, value);
        }
        headers.insert(":status", &status.to_string());
        let version = if version.is_empty() {
            DEFAULT_VERSION
        } else {
            version.as_str()
        };
        let syn = SynStream::new(PUSH_METHOD, &path, &scheme, headers)
            .with_associated_id(associated)
            .with_version(version);

        let mut flags = FrameFlags::empty();
        flags.set_unidirectional(true);
        flags.set_fin(body.is_end_stream() && trailers.is_none());
        let frame = Frame::new(id, flags, Payload::SynStream(syn));

        let stream = self
            .controller
            .streams
            .create_stream(StreamState::HalfClosedRemote);
        self.controller.streams.register(id, stream)?;
        self.controller.streams.set_reply(id, frame, body, trailers);
        debug!(stream_id = id, associated, "spdy stream pushed");
        Ok(id)
    }

    fn start_shutdown(&mut self) -> Result<(), DispatchErrorKind> {
        if self.controller.closing {
            return Ok(());
        }
        debug!("spdy connection shutting down");
        self.controller.shutdown();
        self.send_go_away(GoAwayStatus::Ok)
    }

    fn finish(&mut self) -> Result<(), DispatchErrorKind> {
        if self.controller.go_away_sync.going_away.is_none() {
            self.send_go_away(GoAwayStatus::Ok)?;
        }
        self.controller.torn_down = true;
        self.req_rx.close();
        self.input_tx = None;
        match self.controller.go_away {
            Some(status) => debug!(peer_status = status.as_str(), "spdy connection finished"),
            None => debug!("spdy connection finished"),
        }
        Ok(())
    }

    fn poll_input_request(&mut self, cx: &mut Context<'_>) -> Result<(), DispatchErrorKind> {
        self.controller.streams.requeue_body_pending();
        while let Some(id) = self.controller.streams.next_stream() {
            self.input_stream_frame(cx, id)?;
        }
        Ok(())
    }

    fn input_stream_frame(
        &mut self,
        cx: &mut Context<'_>,
        id: StreamId,
    ) -> Result<(), DispatchErrorKind> {
        if let Some(header) = self.controller.streams.headers(id) {
            self.poll_send_frame(header)?;
        }

        loop {
            match self.controller.streams.poll_read_body(cx, id)? {
                DataReadState::Closed
                | DataReadState::BodyPending
                | DataReadState::WindowPending => {
                    break;
                }
                DataReadState::Ready(data) => {
                    self.poll_send_frame(data)?;
                }
                DataReadState::Finish(frame) => {
                    self.poll_send_frame(frame)?;
                    break;
                }
            }
        }
        Ok(())
    }

    fn poll_send_frame(&mut self, frame: Frame) -> Result<(), DispatchErrorKind> {
        let id = frame.stream_id();
        let eos = frame.flags().is_fin();
        self.send_frame(frame)?;
        if eos {
            self.controller.streams.send_end_stream(id);
        }
        Ok(())
    }

    fn window_update(&mut self) -> Result<(), DispatchErrorKind> {
        for frame in self.controller.streams.window_update_streams() {
            self.send_frame(frame)?;
        }
        if let Some(frame) = self.controller.streams.window_update_conn() {
            self.send_frame(frame)?;
        }
        Ok(())
    }

    fn send_frame(&self, frame: Frame) -> Result<(), DispatchErrorKind> {
        match self.input_tx {
            Some(ref input_tx) => input_tx
                .send(frame)
                .map_err(|_e| DispatchErrorKind::ChannelClosed),
            None => Err(DispatchErrorKind::ChannelClosed),
        }
    }

    fn send_go_away(&mut self, status: GoAwayStatus) -> Result<(), DispatchErrorKind> {
        let last_stream_id = self.controller.streams.latest_remote_id;
        let go_away = Goaway::new(last_stream_id, status.into_code());
        // Avoid sending the same GOAWAY frame multiple times.
        if self.controller.go_away_sync.going_away == Some(go_away) {
            return Ok(());
        }
        self.controller.go_away_sync.going_away = Some(go_away);
        self.send_frame(Frame::go_away(last_stream_id, status))
    }

    fn poll_recv_message(&mut self, frame: Frame) -> Result<(), DispatchErrorKind> {
        match self.poll_recv_frame(frame) {
            Err(DispatchErrorKind::Spdy(SpdyError::StreamError(id, code))) => {
                self.manage_stream_error(id, code)
            }
            other => other,
        }
    }

    fn poll_recv_frame(&mut self, frame: Frame) -> Result<(), DispatchErrorKind> {
        let id = frame.stream_id();
        let flags = *frame.flags();
        match frame.into_payload() {
            Payload::SynStream(syn) => self.recv_syn_stream(id, flags, syn),
            Payload::SynReply(_) => {
                // This side never opens a stream that expects a reply.
                Err(SpdyError::StreamError(id, ErrorCode::Cancel).into())
            }
            Payload::Headers(headers) => self.recv_header_frame(id, flags, headers),
            Payload::Data(data) => self.recv_data_frame(id, flags, data.into_data()),
            Payload::WindowUpdate(windows) => self.recv_window_frame(id, windows),
            Payload::Ping(ping) => self.recv_ping_frame(ping),
            Payload::Settings(settings) => self.recv_settings_frame(settings),
            Payload::RstStream(reset) => self.recv_reset_frame(id, reset),
            Payload::Goaway(go_away) => self.recv_go_away_frame(go_away),
            Payload::Unknown(unknown) => {
                debug!(frame_type = unknown.raw_type(), "unknown spdy frame dropped");
                Ok(())
            }
        }
    }

    fn recv_syn_stream(
        &mut self,
        id: StreamId,
        flags: FrameFlags,
        syn: SynStream,
    ) -> Result<(), DispatchErrorKind> {
        self.controller.streams.check_remote_id(id)?;
        if self.controller.closing {
            debug!(stream_id = id, "spdy stream refused, connection going away");
            return Err(SpdyError::StreamError(id, ErrorCode::RefusedStream).into());
        }
        if flags.is_unidirectional() {
            debug!(stream_id = id, "spdy pushed stream refused");
            return Err(SpdyError::StreamError(id, ErrorCode::RefusedStream).into());
        }
        if self.controller.streams.reach_max_concurrency() {
            debug!(
                stream_id = id,
                open = self.controller.streams.len(),
                "spdy stream refused, concurrency limit reached"
            );
            return Err(SpdyError::StreamError(id, ErrorCode::RefusedStream).into());
        }

        let eos = flags.is_fin();
        let state = if eos {
            StreamState::HalfClosedRemote
        } else {
            StreamState::Open
        };
        let (body_tx, body) = if eos {
            (None, RequestBody::empty(id, self.req_tx.clone()))
        } else {
            let (tx, body) = RequestBody::channel(id, self.req_tx.clone());
            (Some(tx), body)
        };
        let mut stream = self.controller.streams.create_stream(state);
        stream.body_tx = body_tx;
        stream.version = syn.version().to_string();

        let request = Request::new(
            id,
            syn.method().to_string(),
            syn.path().to_string(),
            syn.scheme().to_string(),
            syn.version().to_string(),
            syn.into_headers(),
            body,
            Pusher::new(id, self.req_tx.clone()),
        );
        self.controller.streams.register(id, stream)?;
        let task = self.spawn_service(id, request);
        if let Some(stream) = self.controller.streams.get_mut(id) {
            stream.task = Some(task);
        }
        debug!(stream_id = id, eos, "spdy stream opened");
        Ok(())
    }

    // The service runs on a task of its own so that a panic in it only fails
    // its stream. Aborting the returned handle aborts the service as well.
    fn spawn_service(&self, id: StreamId, request: Request) -> JoinHandle<()> {
        let service = self.service.clone();
        let notifier = self.req_tx.clone();
        let task = ServiceTask(spawn(async move { service.call(request).await }));
        spawn(async move {
            let response = match task.await {
                Ok(response) => response,
                Err(e) if e.is_panic() => {
                    warn!(stream_id = id, "spdy service panicked");
                    Err(MuxError::service("service panicked"))
                }
                Err(_) => return,
            };
            // The connection may be gone already.
            let _ = notifier.send(ReqMessage::Response { id, response });
        })
    }

    fn recv_header_frame(
        &mut self,
        id: StreamId,
        flags: FrameFlags,
        headers: HeaderBlock,
    ) -> Result<(), DispatchErrorKind> {
        if id == 0 {
            return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError).into());
        }
        match self
            .controller
            .streams
            .recv_headers(id, headers.into_headers(), flags.is_fin())
        {
            FrameRecvState::OK => Ok(()),
            FrameRecvState::UnknownStream(_) | FrameRecvState::StreamClosed(_) => {
                Err(SpdyError::StreamError(id, ErrorCode::Cancel).into())
            }
            FrameRecvState::Err(e) => Err(e.into()),
        }
    }

    fn recv_data_frame(
        &mut self,
        id: StreamId,
        flags: FrameFlags,
        data: Bytes,
    ) -> Result<(), DispatchErrorKind> {
        if id == 0 {
            return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError).into());
        }
        match self.controller.streams.recv_data(id, data, flags.is_fin()) {
            FrameRecvState::OK => Ok(()),
            FrameRecvState::UnknownStream(update) | FrameRecvState::StreamClosed(update) => {
                if let Some(frame) = update {
                    self.send_frame(frame)?;
                }
                Err(SpdyError::StreamError(id, ErrorCode::Cancel).into())
            }
            FrameRecvState::Err(e) => {
                warn!(stream_id = id, "spdy flow control violated by peer");
                Err(e.into())
            }
        }
    }

    fn recv_window_frame(
        &mut self,
        id: StreamId,
        windows: WindowUpdate,
    ) -> Result<(), DispatchErrorKind> {
        let delta = windows.get_delta();
        if id == 0 {
            self.controller.streams.increase_conn_send_window(delta)?;
        } else {
            self.controller
                .streams
                .reassign_stream_send_window(id, delta)?;
        }
        Ok(())
    }

    fn recv_ping_frame(&mut self, ping: Ping) -> Result<(), DispatchErrorKind> {
        // Pings with this side's parity answer pings this side sent.
        if self.controller.streams.role().is_local_id(ping.id()) {
            debug!(ping_id = ping.id(), "spdy ping reply ignored");
            return Ok(());
        }
        self.send_frame(Frame::ping(ping.id()))
    }

    fn recv_settings_frame(&mut self, settings: Settings) -> Result<(), DispatchErrorKind> {
        apply_settings(&mut self.controller.streams, &settings)?;
        Ok(())
    }

    fn recv_reset_frame(
        &mut self,
        id: StreamId,
        reset: RstStream,
    ) -> Result<(), DispatchErrorKind> {
        let code = reset.error_code().unwrap_or(ErrorCode::ProtocolError);
        match self.controller.streams.recv_remote_reset(id, code) {
            StreamEndState::OK => {
                debug!(stream_id = id, code = code.as_str(), "spdy stream reset by peer");
            }
            // Never answer a reset with a reset.
            StreamEndState::Ignore => {
                debug!(stream_id = id, "spdy reset of unknown stream ignored");
            }
        }
        Ok(())
    }

    fn recv_go_away_frame(&mut self, go_away: Goaway) -> Result<(), DispatchErrorKind> {
        let status = GoAwayStatus::try_from(go_away.get_status())
            .unwrap_or(GoAwayStatus::ProtocolError);
        // Prevents the current connection from admitting new streams.
        self.controller.shutdown();
        self.controller.go_away = Some(status);
        let last_stream_id = go_away.get_last_stream_id();
        let closed = self
            .controller
            .streams
            .go_away_local_streams(last_stream_id);
        debug!(
            last_stream_id,
            status = status.as_str(),
            closed = closed.len(),
            "spdy peer going away"
        );
        Ok(())
    }

    fn manage_stream_error(
        &mut self,
        id: StreamId,
        code: ErrorCode,
    ) -> Result<(), DispatchErrorKind> {
        if let StreamEndState::OK = self.controller.streams.send_local_reset(id, code) {
            debug!(stream_id = id, code = code.as_str(), "spdy stream reset");
        }
        self.send_frame(Frame::rst_stream(id, code))
    }

    /// Tears the connection down after a fatal error. Runs at most once.
    pub(crate) fn exit_with_error(&mut self, error: DispatchErrorKind) {
        if self.controller.torn_down {
            return;
        }
        self.controller.torn_down = true;
        self.controller.shutdown();
        self.req_rx.close();
        self.controller.streams.kill_all(&error);

        let writer_open = match self.input_tx {
            Some(ref input_tx) => !input_tx.is_closed(),
            None => false,
        };
        if let (Some(status), true) = (error.go_away_status(), writer_open) {
            if let Err(e) = self.send_go_away(status) {
                debug!(error = ?e, "spdy GOAWAY not sent");
            }
        }
        match error {
            DispatchErrorKind::Disconnect => debug!("spdy connection torn down, peer closed"),
            ref e => error!(error = ?e, "spdy connection torn down"),
        }
        // Lets the writer flush and close the transport.
        self.input_tx = None;
    }
}
