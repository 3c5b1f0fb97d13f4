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

//! Streams operations utils.

use std::cmp::min;
use std::collections::{HashMap, HashSet, VecDeque};
use std::task::Context;

use bytes::Bytes;
use tracing::debug;
use ylong_spdy::frame::{StreamId, DEFAULT_WINDOW_SIZE, MAX_STREAM_ID};
use ylong_spdy::{ErrorCode, Frame, GoAwayStatus, Headers, SpdyError};

use crate::body::{Body, BodyMessage};
use crate::config::Role;
use crate::dispatcher::{dispatch_mux_error, DispatchErrorKind};
use crate::mux::data_ref::{BodyDataRef, BodyRead};
use crate::mux::flow_control::FlowControl;
use crate::mux::window::{RecvWindow, SendWindow};
use crate::runtime::{JoinHandle, UnboundedSender};
use crate::{ErrorKind, MuxError, SpdyConfig};

const INITIAL_LATEST_REMOTE_ID: StreamId = 0;

pub(crate) enum FrameRecvState {
    OK,
    // No such stream. Carries the connection credit returned for the frame.
    UnknownStream(Option<Frame>),
    // The peer already finished sending on the stream. Carries the
    // connection credit returned for the frame.
    StreamClosed(Option<Frame>),
    Err(SpdyError),
}

pub(crate) enum DataReadState {
    Closed,
    // Wait for the body to produce data.
    BodyPending,
    // Wait for a WINDOW_UPDATE.
    WindowPending,
    Ready(Frame),
    Finish(Frame),
}

pub(crate) enum StreamEndState {
    OK,
    Ignore,
}

//                      +--------+
//          send FIN    |        |    recv FIN
//         ,------------|  open  |------------.
//        /             |        |             \
//       v              +--------+              v
//  +----------+            |            +----------+
//  |   half   |            |            |   half   |
//  |  closed  |            | send R /   |  closed  |
//  | (local)  |            | recv R     | (remote) |
//  +----------+            |            +----------+
//       |                  |                  |
//       | recv FIN /       v       send FIN / |
//       | send R /     +--------+     send R / |
//       | recv R       |        |     recv R  |
//       `------------->| closed |<------------'
//                      |        |
//                      +--------+
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum StreamState {
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed(CloseReason),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum CloseReason {
    LocalRst,
    RemoteRst,
    RemoteGoAway,
    LocalGoAway,
    EndStream,
}

pub(crate) struct Stream {
    pub(crate) recv_window: RecvWindow,
    pub(crate) send_window: SendWindow,
    pub(crate) state: StreamState,
    // SYN_REPLY, or SYN_STREAM of a pushed stream, waiting to be sent.
    pub(crate) header: Option<Frame>,
    pub(crate) data: BodyDataRef,
    pub(crate) trailers: Option<Headers>,
    // Protocol version the reply is labelled with.
    pub(crate) version: String,
    pub(crate) body_tx: Option<UnboundedSender<BodyMessage>>,
    // Bytes handed to the request body and not consumed yet.
    pub(crate) buffered: u32,
    pub(crate) task: Option<JoinHandle<()>>,
}

pub(crate) struct Streams {
    role: Role,
    // The highest stream id the peer initiated, accepted or refused.
    pub(crate) latest_remote_id: StreamId,
    next_local_id: StreamId,
    pub(crate) stream_recv_window_size: u32,
    pub(crate) stream_send_window_size: u32,
    max_concurrent_streams: Option<u32>,
    max_data_frame_size: usize,
    window_update_ratio: u32,
    flow_control: FlowControl,
    pending_stream_window: HashSet<StreamId>,
    pending_conn_window: VecDeque<StreamId>,
    pending_body: HashSet<StreamId>,
    pending_send: VecDeque<StreamId>,
    window_updating_streams: VecDeque<StreamId>,
    stream_map: HashMap<StreamId, Stream>,
}

impl Streams {
    pub(crate) fn new(config: &SpdyConfig, flow_control: FlowControl) -> Self {
        Self {
            role: config.role(),
            latest_remote_id: INITIAL_LATEST_REMOTE_ID,
            next_local_id: config.role().first_local_id(),
            stream_recv_window_size: config.get_stream_window_size(),
            stream_send_window_size: DEFAULT_WINDOW_SIZE,
            max_concurrent_streams: config.get_max_concurrent_streams(),
            max_data_frame_size: config.get_max_data_frame_size(),
            window_update_ratio: config.get_window_update_ratio(),
            flow_control,
            pending_stream_window: HashSet::new(),
            pending_conn_window: VecDeque::new(),
            pending_body: HashSet::new(),
            pending_send: VecDeque::new(),
            window_updating_streams: VecDeque::new(),
            stream_map: HashMap::new(),
        }
    }

    pub(crate) fn register(&mut self, id: StreamId, stream: Stream) -> Result<(), SpdyError> {
        if self.stream_map.contains_key(&id) {
            return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError));
        }
        self.stream_map.insert(id, stream);
        Ok(())
    }

    pub(crate) fn get(&self, id: StreamId) -> Option<&Stream> {
        self.stream_map.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.stream_map.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: StreamId) -> Option<Stream> {
        self.stream_map.remove(&id)
    }

    pub(crate) fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(StreamId, &mut Stream),
    {
        for (id, stream) in self.stream_map.iter_mut() {
            f(*id, stream);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.stream_map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.stream_map.is_empty()
    }

    pub(crate) fn role(&self) -> Role {
        self.role
    }

    /// Creates a stream with the current initial window sizes.
    pub(crate) fn create_stream(&self, state: StreamState) -> Stream {
        Stream::new(
            RecvWindow::new(self.stream_recv_window_size),
            SendWindow::new(self.stream_send_window_size),
            state,
        )
    }

    /// Checks the id of a stream the peer opens. Ids must carry the peer's
    /// parity and grow strictly, even across refused streams.
    pub(crate) fn check_remote_id(&mut self, id: StreamId) -> Result<(), SpdyError> {
        if id == 0
            || id > MAX_STREAM_ID
            || self.role.is_local_id(id)
            || id <= self.latest_remote_id
        {
            return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError));
        }
        self.latest_remote_id = id;
        Ok(())
    }

    pub(crate) fn generate_local_id(&mut self) -> Result<StreamId, SpdyError> {
        let id = self.next_local_id;
        if id > MAX_STREAM_ID {
            return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError));
        }
        self.next_local_id += 2;
        Ok(id)
    }

    pub(crate) fn reach_max_concurrency(&self) -> bool {
        match self.max_concurrent_streams {
            None => false,
            Some(max) => self.stream_map.len() >= max as usize,
        }
    }

    pub(crate) fn apply_max_concurrent_streams(&mut self, num: u32) {
        self.max_concurrent_streams = Some(num);
    }

    /// Applies the difference between the new and the old initial window
    /// size to every open stream.
    pub(crate) fn apply_send_initial_window_size(&mut self, size: u32) -> Result<(), SpdyError> {
        let delta = size as i64 - self.stream_send_window_size as i64;
        self.stream_send_window_size = size;
        if delta == 0 {
            return Ok(());
        }
        let mut result = Ok(());
        self.for_each(|_id, stream| {
            if let Err(e) = stream.send_window.apply_delta(delta) {
                result = Err(e);
            }
            stream.recv_window.apply_delta(delta);
        });
        if delta > 0 {
            for id in self.pending_stream_window.drain() {
                self.pending_send.push_back(id);
            }
        }
        result
    }

    pub(crate) fn increase_conn_send_window(&mut self, size: u32) -> Result<(), SpdyError> {
        self.flow_control.increase_send_size(size)?;
        // A body's size is unknown up front, so every stream waiting for the
        // connection window gets another try.
        while let Some(id) = self.pending_conn_window.pop_front() {
            self.pending_send.push_back(id);
        }
        Ok(())
    }

    pub(crate) fn reassign_stream_send_window(
        &mut self,
        id: StreamId,
        size: u32,
    ) -> Result<(), SpdyError> {
        if let Some(stream) = self.stream_map.get_mut(&id) {
            stream.send_window.increase_size(size)?;
        }
        if self.pending_stream_window.take(&id).is_some() {
            self.pending_send.push_back(id);
        }
        Ok(())
    }

    pub(crate) fn setup_conn_recv_window(&mut self, size: u32) -> Option<Frame> {
        self.flow_control.setup_recv_window(size)
    }

    pub(crate) fn conn_recv_available(&self) -> u32 {
        self.flow_control.recv_size_available()
    }

    /// Accounts for a DATA frame received on stream `id` and hands the data
    /// to its request body.
    pub(crate) fn recv_data(&mut self, id: StreamId, data: Bytes, eos: bool) -> FrameRecvState {
        let len = data.len() as u32;
        if let Err(e) = self.flow_control.recv_data(len) {
            return FrameRecvState::Err(e);
        }
        let stream = match self.stream_map.get_mut(&id) {
            None => return FrameRecvState::UnknownStream(self.flow_control.credit_back(len)),
            Some(stream) => stream,
        };
        if !stream.is_remote_open() {
            return FrameRecvState::StreamClosed(self.flow_control.credit_back(len));
        }
        if let Err(e) = stream.recv_window.recv_data(len) {
            return FrameRecvState::Err(e);
        }

        if len > 0 {
            let delivered = match stream.body_tx {
                Some(ref tx) => tx.send(BodyMessage::Data(data)).is_ok(),
                None => false,
            };
            if delivered {
                stream.buffered += len;
            } else {
                // Nobody reads the body anymore.
                stream.recv_window.release(len);
                self.flow_control.release(len);
                self.window_updating_streams.push_back(id);
            }
        }
        if eos {
            self.recv_end_stream(id);
        }
        FrameRecvState::OK
    }

    /// Hands trailers received on stream `id` to its request body.
    pub(crate) fn recv_headers(
        &mut self,
        id: StreamId,
        headers: Headers,
        eos: bool,
    ) -> FrameRecvState {
        let stream = match self.stream_map.get_mut(&id) {
            None => return FrameRecvState::UnknownStream(None),
            Some(stream) => stream,
        };
        if !stream.is_remote_open() {
            return FrameRecvState::StreamClosed(None);
        }
        if let Some(ref tx) = stream.body_tx {
            let _ = tx.send(BodyMessage::Trailers(headers));
        }
        if eos {
            self.recv_end_stream(id);
        }
        FrameRecvState::OK
    }

    fn recv_end_stream(&mut self, id: StreamId) {
        if let Some(stream) = self.stream_map.get_mut(&id) {
            if let Some(tx) = stream.body_tx.take() {
                let _ = tx.send(BodyMessage::Finish);
            }
            stream.state = match stream.state {
                StreamState::Open => StreamState::HalfClosedRemote,
                StreamState::HalfClosedLocal => StreamState::Closed(CloseReason::EndStream),
                state => state,
            };
            if let StreamState::Closed(reason) = stream.state {
                self.close(id, reason, None);
            }
        }
    }

    /// Records that a frame carrying FIN was sent on stream `id`.
    pub(crate) fn send_end_stream(&mut self, id: StreamId) {
        if let Some(stream) = self.stream_map.get_mut(&id) {
            stream.data.clear();
            stream.state = match stream.state {
                StreamState::Open => StreamState::HalfClosedLocal,
                StreamState::HalfClosedRemote => StreamState::Closed(CloseReason::EndStream),
                state => state,
            };
            if let StreamState::Closed(reason) = stream.state {
                self.close(id, reason, None);
            }
        }
    }

    /// Returns the credit of `size` consumed bytes of stream `id`.
    pub(crate) fn release_recv(&mut self, id: StreamId, size: u32) {
        // Credit of a finished stream was returned when it closed.
        if let Some(stream) = self.stream_map.get_mut(&id) {
            let size = min(size, stream.buffered);
            stream.buffered -= size;
            stream.recv_window.release(size);
            self.flow_control.release(size);
            self.window_updating_streams.push_back(id);
        }
    }

    pub(crate) fn recv_remote_reset(&mut self, id: StreamId, code: ErrorCode) -> StreamEndState {
        if !self.stream_map.contains_key(&id) {
            return StreamEndState::Ignore;
        }
        let error = MuxError::from(SpdyError::StreamError(id, code));
        self.close(id, CloseReason::RemoteRst, Some(error));
        StreamEndState::OK
    }

    pub(crate) fn send_local_reset(&mut self, id: StreamId, code: ErrorCode) -> StreamEndState {
        if !self.stream_map.contains_key(&id) {
            return StreamEndState::Ignore;
        }
        let error = MuxError::new_with_cause(
            ErrorKind::Closed,
            Some(SpdyError::StreamError(id, code)),
        );
        self.close(id, CloseReason::LocalRst, Some(error));
        StreamEndState::OK
    }

    /// Closes the streams this side initiated above `last_stream_id`, which
    /// the peer will never process.
    pub(crate) fn go_away_local_streams(&mut self, last_stream_id: StreamId) -> Vec<StreamId> {
        let role = self.role;
        let ids: Vec<StreamId> = self
            .stream_map
            .keys()
            .filter(|id| role.is_local_id(**id) && **id > last_stream_id)
            .copied()
            .collect();
        for id in ids.iter() {
            let error = MuxError::new_with_message(ErrorKind::Closed, "Peer Going Away !");
            self.close(*id, CloseReason::RemoteGoAway, Some(error));
        }
        ids
    }

    /// Kills every stream, failing their request bodies with `error`.
    pub(crate) fn kill_all(&mut self, error: &DispatchErrorKind) {
        self.for_each(|_id, stream| {
            stream.state = StreamState::Closed(CloseReason::LocalGoAway);
            stream.fail(dispatch_mux_error(error));
        });
        self.stream_map.clear();
        self.pending_stream_window.clear();
        self.pending_conn_window.clear();
        self.pending_body.clear();
        self.pending_send.clear();
        self.window_updating_streams.clear();
    }

    fn close(&mut self, id: StreamId, reason: CloseReason, error: Option<MuxError>) {
        if let Some(mut stream) = self.remove(id) {
            if let Some(error) = error {
                stream.fail(error);
            }
            // Data still buffered for the application will never be
            // consumed through this stream.
            self.flow_control.release(stream.buffered);
            debug!(
                stream_id = id,
                reason = ?reason,
                unreleased = stream.recv_window.unreleased(),
                "spdy stream closed"
            );
        }
    }

    /// Installs the reply of stream `id` and schedules it for sending.
    pub(crate) fn set_reply(
        &mut self,
        id: StreamId,
        header: Frame,
        body: Body,
        trailers: Option<Headers>,
    ) -> bool {
        match self.stream_map.get_mut(&id) {
            None => false,
            Some(stream) => {
                stream.header = Some(header);
                stream.data = BodyDataRef::new(body);
                stream.trailers = trailers;
                self.pending_send.push_back(id);
                true
            }
        }
    }

    pub(crate) fn headers(&mut self, id: StreamId) -> Option<Frame> {
        self.stream_map
            .get_mut(&id)
            .and_then(|stream| stream.header.take())
    }

    pub(crate) fn next_stream(&mut self) -> Option<StreamId> {
        self.pending_send.pop_front()
    }

    /// Gives every stream blocked on its body another try.
    pub(crate) fn requeue_body_pending(&mut self) {
        for id in self.pending_body.drain() {
            self.pending_send.push_back(id);
        }
    }

    pub(crate) fn poll_read_body(
        &mut self,
        cx: &mut Context<'_>,
        id: StreamId,
    ) -> Result<DataReadState, SpdyError> {
        let stream = match self.stream_map.get_mut(&id) {
            None => return Ok(DataReadState::Closed),
            Some(stream) => stream,
        };
        if !stream.is_local_open() || stream.header.is_some() {
            return Ok(DataReadState::Closed);
        }
        if stream.data.is_end() {
            return Ok(DataReadState::Finish(stream.finish_frame(id)));
        }

        let stream_send_vacant = stream.send_window.size_available() as usize;
        if stream_send_vacant == 0 {
            self.pending_stream_window.insert(id);
            return Ok(DataReadState::WindowPending);
        }
        let conn_send_vacant = self.flow_control.send_size_available();
        if conn_send_vacant == 0 {
            self.pending_conn_window.push_back(id);
            return Ok(DataReadState::WindowPending);
        }
        let len = min(
            min(stream_send_vacant, conn_send_vacant),
            self.max_data_frame_size,
        );

        match stream.data.poll_read(cx, len) {
            BodyRead::Chunk(data) => {
                let size = data.len() as u32;
                stream.send_window.send_data(size)?;
                self.flow_control.send_data(size)?;
                if stream.data.is_end() && stream.trailers.is_none() {
                    Ok(DataReadState::Finish(Frame::data(id, data, true)))
                } else {
                    Ok(DataReadState::Ready(Frame::data(id, data, false)))
                }
            }
            BodyRead::Blocked => {
                self.pending_body.insert(id);
                Ok(DataReadState::BodyPending)
            }
            BodyRead::End => Ok(DataReadState::Finish(stream.finish_frame(id))),
        }
    }

    pub(crate) fn window_update_conn(&mut self) -> Option<Frame> {
        self.flow_control
            .check_conn_recv_window_update(self.window_update_ratio)
    }

    pub(crate) fn window_update_streams(&mut self) -> Vec<Frame> {
        let mut frames = vec![];
        while let Some(id) = self.window_updating_streams.pop_front() {
            if let Some(stream) = self.stream_map.get_mut(&id) {
                // The peer sends nothing more once its side is closed.
                if !stream.is_remote_open() {
                    continue;
                }
                if let Some(frame) = stream
                    .recv_window
                    .check_window_update(id, self.window_update_ratio)
                {
                    frames.push(frame);
                }
            }
        }
        frames
    }
}

impl Stream {
    pub(crate) fn new(
        recv_window: RecvWindow,
        send_window: SendWindow,
        state: StreamState,
    ) -> Self {
        Self {
            recv_window,
            send_window,
            state,
            header: None,
            data: BodyDataRef::empty(),
            trailers: None,
            version: String::new(),
            body_tx: None,
            buffered: 0,
            task: None,
        }
    }

    pub(crate) fn is_remote_open(&self) -> bool {
        matches!(self.state, StreamState::Open | StreamState::HalfClosedLocal)
    }

    pub(crate) fn is_local_open(&self) -> bool {
        matches!(self.state, StreamState::Open | StreamState::HalfClosedRemote)
    }

    fn finish_frame(&mut self, id: StreamId) -> Frame {
        match self.trailers.take() {
            Some(trailers) => Frame::headers(id, trailers, true),
            None => Frame::data(id, Bytes::new(), true),
        }
    }

    fn fail(&mut self, error: MuxError) {
        if let Some(tx) = self.body_tx.take() {
            let _ = tx.send(BodyMessage::Exit(error));
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.header = None;
        self.data.clear();
    }
}

#[cfg(test)]
mod ut_streams {
    use bytes::Bytes;
    use ylong_spdy::{ErrorCode, GoAwayStatus, Payload, SpdyError};

    use crate::body::{BodyMessage, RequestBody};
    use crate::mux::flow_control::FlowControl;
    use crate::mux::streams::{FrameRecvState, StreamEndState, StreamState, Streams};
    use crate::runtime::unbounded_channel;
    use crate::{Role, SpdyConfig};

    fn streams(config: SpdyConfig) -> Streams {
        let flow = FlowControl::new(
            config.get_conn_window_size(),
            config.get_conn_window_size(),
        );
        Streams::new(&config, flow)
    }

    fn open(streams: &mut Streams, id: u32) -> RequestBody {
        let (notifier, _notified) = unbounded_channel();
        let (tx, body) = RequestBody::channel(id, notifier);
        let mut stream = streams.create_stream(StreamState::Open);
        stream.body_tx = Some(tx);
        streams.register(id, stream).unwrap();
        body
    }

    /// UT test cases for `Streams::register`.
    ///
    /// # Brief
    /// 1. Registers a stream twice.
    /// 2. Checks that the second registration fails and the first stream is
    ///    kept.
    #[test]
    fn ut_streams_register_duplicate() {
        let mut streams = streams(SpdyConfig::new(Role::Server));
        let _body = open(&mut streams, 1);
        let stream = streams.create_stream(StreamState::HalfClosedRemote);
        assert_eq!(
            streams.register(1, stream),
            Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError))
        );
        assert_eq!(streams.len(), 1);
        assert_eq!(streams.get(1).unwrap().state, StreamState::Open);
        assert!(streams.remove(1).is_some());
        assert!(streams.get(1).is_none());
    }

    /// UT test cases for `Streams::check_remote_id`.
    ///
    /// # Brief
    /// 1. Checks ids of the wrong parity, zero and non-increasing ids.
    /// 2. Checks that valid ids are recorded.
    #[test]
    fn ut_streams_check_remote_id() {
        let mut streams = streams(SpdyConfig::new(Role::Server));
        assert!(streams.check_remote_id(0).is_err());
        assert!(streams.check_remote_id(2).is_err());
        assert!(streams.check_remote_id(3).is_ok());
        assert_eq!(streams.latest_remote_id, 3);
        assert!(streams.check_remote_id(3).is_err());
        assert!(streams.check_remote_id(1).is_err());
        assert!(streams.check_remote_id(5).is_ok());

        let mut client = self::streams(SpdyConfig::new(Role::Client));
        assert!(client.check_remote_id(1).is_err());
        assert!(client.check_remote_id(2).is_ok());
        assert_eq!(client.generate_local_id().unwrap(), 1);
        assert_eq!(client.generate_local_id().unwrap(), 3);
    }

    /// UT test cases for `Streams::reach_max_concurrency`.
    ///
    /// # Brief
    /// 1. Fills the stream table up to the ceiling.
    /// 2. Lowers the ceiling and checks admission.
    #[test]
    fn ut_streams_concurrency_ceiling() {
        let config = SpdyConfig::new(Role::Server).max_concurrent_streams(Some(2));
        let mut streams = streams(config);
        let _a = open(&mut streams, 1);
        assert!(!streams.reach_max_concurrency());
        let _b = open(&mut streams, 3);
        assert!(streams.reach_max_concurrency());
        streams.apply_max_concurrent_streams(3);
        assert!(!streams.reach_max_concurrency());

        let config = SpdyConfig::new(Role::Server).max_concurrent_streams(None);
        let mut unbounded = self::streams(config);
        let _c = open(&mut unbounded, 1);
        assert!(!unbounded.reach_max_concurrency());
    }

    /// UT test cases for `Streams::recv_data` on an unknown stream.
    ///
    /// # Brief
    /// 1. Receives DATA for a stream that does not exist.
    /// 2. Checks that the connection window is credited back by the frame
    ///    size through a connection WINDOW_UPDATE.
    #[test]
    fn ut_streams_recv_data_unknown() {
        let mut streams = streams(SpdyConfig::new(Role::Server));
        let before = streams.conn_recv_available();
        match streams.recv_data(7, Bytes::from_static(b"12345"), false) {
            FrameRecvState::UnknownStream(Some(frame)) => {
                assert_eq!(frame.stream_id(), 0);
                match frame.payload() {
                    Payload::WindowUpdate(update) => assert_eq!(update.get_delta(), 5),
                    _ => panic!("unexpected payload"),
                }
            }
            _ => panic!("expected an unknown stream"),
        }
        assert_eq!(streams.conn_recv_available(), before);
    }

    /// UT test cases for `Streams::recv_data` window accounting.
    ///
    /// # Brief
    /// 1. Receives DATA, then releases part of it.
    /// 2. Checks that the windows plus outstanding bytes stay equal to the
    ///    initial size.
    /// 3. Receives DATA beyond the stream window.
    #[tokio::test]
    async fn ut_streams_recv_data_conservation() {
        let mut streams = streams(SpdyConfig::new(Role::Server).stream_window_size(100));
        let mut body = open(&mut streams, 1);
        assert!(matches!(
            streams.recv_data(1, Bytes::from(vec![0u8; 60]), false),
            FrameRecvState::OK
        ));
        let stream = streams.get(1).unwrap();
        assert_eq!(stream.recv_window.available() + stream.buffered, 100);

        assert_eq!(body.data().await.unwrap().unwrap().len(), 60);
        streams.release_recv(1, 60);
        let stream = streams.get(1).unwrap();
        assert_eq!(stream.buffered, 0);
        assert_eq!(stream.recv_window.unreleased(), 60);
        let updates = streams.window_update_streams();
        assert_eq!(updates.len(), 1);
        assert_eq!(streams.get(1).unwrap().recv_window.available(), 100);

        assert!(matches!(
            streams.recv_data(1, Bytes::from(vec![0u8; 101]), false),
            FrameRecvState::Err(_)
        ));
    }

    /// UT test cases for end of stream handling.
    ///
    /// # Brief
    /// 1. Receives FIN, then DATA on the same stream.
    /// 2. Sends FIN and checks that the stream is removed.
    #[tokio::test]
    async fn ut_streams_end_stream() {
        let mut streams = streams(SpdyConfig::new(Role::Server));
        let mut body = open(&mut streams, 1);
        assert!(matches!(
            streams.recv_data(1, Bytes::from_static(b"ab"), true),
            FrameRecvState::OK
        ));
        assert_eq!(streams.get(1).unwrap().state, StreamState::HalfClosedRemote);
        assert!(matches!(
            streams.recv_data(1, Bytes::from_static(b"c"), false),
            FrameRecvState::StreamClosed(Some(_))
        ));
        assert_eq!(body.collect().await.unwrap(), "ab");

        streams.send_end_stream(1);
        assert!(streams.get(1).is_none());
        assert!(streams.is_empty());
    }

    /// UT test cases for `Streams::apply_send_initial_window_size`.
    ///
    /// # Brief
    /// 1. Sends data on two streams.
    /// 2. Shrinks, then grows the initial window size.
    /// 3. Checks that the delta is applied once to every stream.
    #[test]
    fn ut_streams_settings_delta() {
        let mut streams = streams(SpdyConfig::new(Role::Server));
        let _a = open(&mut streams, 1);
        let _b = open(&mut streams, 3);
        streams.get_mut(1).unwrap().send_window.send_data(60000).unwrap();

        streams.apply_send_initial_window_size(1000).unwrap();
        assert_eq!(streams.get(1).unwrap().send_window.size_available(), 0);
        assert_eq!(streams.get(3).unwrap().send_window.size_available(), 1000);

        streams.apply_send_initial_window_size(66536).unwrap();
        assert_eq!(streams.get(1).unwrap().send_window.size_available(), 6536);
        assert_eq!(streams.get(3).unwrap().send_window.size_available(), 66536);

        let stream = streams.create_stream(StreamState::Open);
        assert_eq!(stream.send_window.size_available(), 66536);
    }

    /// UT test cases for resets.
    ///
    /// # Brief
    /// 1. Resets a known stream from the peer side, then an unknown one.
    /// 2. Checks that the request body fails and the unknown reset is
    ///    ignored.
    #[tokio::test]
    async fn ut_streams_reset() {
        let mut streams = streams(SpdyConfig::new(Role::Server));
        let mut body = open(&mut streams, 1);
        streams.recv_data(1, Bytes::from_static(b"abc"), false);
        let available = streams.conn_recv_available();

        assert!(matches!(
            streams.recv_remote_reset(1, ErrorCode::Cancel),
            StreamEndState::OK
        ));
        assert!(streams.get(1).is_none());
        assert!(matches!(
            streams.recv_remote_reset(1, ErrorCode::Cancel),
            StreamEndState::Ignore
        ));
        assert!(matches!(
            streams.send_local_reset(9, ErrorCode::Cancel),
            StreamEndState::Ignore
        ));
        // Buffered data stays readable, the error follows it.
        assert_eq!(body.data().await.unwrap().unwrap(), "abc");
        assert!(body.data().await.unwrap().is_err());
        assert_eq!(streams.conn_recv_available(), available);
    }

    /// UT test cases for `Streams::kill_all`.
    ///
    /// # Brief
    /// 1. Opens streams and kills them all.
    /// 2. Checks that every request body is failed once.
    #[test]
    fn ut_streams_kill_all() {
        use crate::dispatcher::DispatchErrorKind;

        let mut streams = streams(SpdyConfig::new(Role::Server));
        let (tx, mut rx) = unbounded_channel();
        let mut stream = streams.create_stream(StreamState::Open);
        stream.body_tx = Some(tx);
        streams.register(1, stream).unwrap();

        streams.kill_all(&DispatchErrorKind::Disconnect);
        assert!(streams.is_empty());
        assert!(matches!(rx.try_recv(), Ok(BodyMessage::Exit(_))));
        assert!(rx.try_recv().is_err());
    }
}
