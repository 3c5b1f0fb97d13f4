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

//! Request and response bodies.
//!
//! - [`RequestBody`] yields the DATA a peer sends on a stream. Every chunk
//!   handed to the application returns its flow control credit to the peer.
//! - [`Body`] is the payload of a [`crate::Response`], either complete or fed
//!   through a [`BodySender`].

use std::future::poll_fn;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use ylong_spdy::{Headers, StreamId};

use crate::dispatcher::ReqMessage;
use crate::runtime::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use crate::{ErrorKind, MuxError};

pub(crate) enum BodyMessage {
    Data(Bytes),
    Trailers(Headers),
    Finish,
    Exit(MuxError),
}

/// The body of a request received on a stream.
///
/// Data is produced lazily as DATA frames arrive.
pub struct RequestBody {
    id: StreamId,
    receiver: Option<UnboundedReceiver<BodyMessage>>,
    notifier: UnboundedSender<ReqMessage>,
    trailers: Option<Headers>,
}

impl RequestBody {
    pub(crate) fn empty(id: StreamId, notifier: UnboundedSender<ReqMessage>) -> Self {
        Self {
            id,
            receiver: None,
            notifier,
            trailers: None,
        }
    }

    pub(crate) fn channel(
        id: StreamId,
        notifier: UnboundedSender<ReqMessage>,
    ) -> (UnboundedSender<BodyMessage>, Self) {
        let (tx, rx) = unbounded_channel();
        let body = Self {
            id,
            receiver: Some(rx),
            notifier,
            trailers: None,
        };
        (tx, body)
    }

    /// Receives the next chunk of data.
    ///
    /// Returns `None` once the peer has finished the stream, or an error if
    /// the stream was reset or the connection went away.
    pub async fn data(&mut self) -> Option<Result<Bytes, MuxError>> {
        poll_fn(|cx| self.poll_data(cx)).await
    }

    /// Polls for the next chunk of data.
    pub fn poll_data(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, MuxError>>> {
        loop {
            let receiver = match self.receiver.as_mut() {
                None => return Poll::Ready(None),
                Some(receiver) => receiver,
            };
            let message = match receiver.poll_recv(cx) {
                Poll::Ready(message) => message,
                Poll::Pending => return Poll::Pending,
            };
            match message {
                Some(BodyMessage::Data(data)) => {
                    if data.is_empty() {
                        continue;
                    }
                    self.consumed(data.len());
                    return Poll::Ready(Some(Ok(data)));
                }
                Some(BodyMessage::Trailers(trailers)) => {
                    self.trailers = Some(trailers);
                }
                Some(BodyMessage::Finish) => {
                    self.receiver = None;
                    return Poll::Ready(None);
                }
                Some(BodyMessage::Exit(e)) => {
                    self.receiver = None;
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    self.receiver = None;
                    return Poll::Ready(Some(Err(MuxError::new_with_message(
                        ErrorKind::Closed,
                        "Stream Closed !",
                    ))));
                }
            }
        }
    }

    /// Reads the rest of the body into one buffer.
    pub async fn collect(&mut self) -> Result<Bytes, MuxError> {
        let mut buf = BytesMut::new();
        while let Some(data) = self.data().await {
            buf.extend_from_slice(&data?);
        }
        Ok(buf.freeze())
    }

    /// Trailers sent by the peer, available once the body is finished.
    pub fn trailers(&self) -> Option<&Headers> {
        self.trailers.as_ref()
    }

    /// Whether the peer has finished the stream and all data was read.
    pub fn is_end_stream(&self) -> bool {
        self.receiver.is_none()
    }

    fn consumed(&self, size: usize) {
        // A closed manager no longer accounts for credit.
        let _ = self.notifier.send(ReqMessage::Consumed {
            id: self.id,
            size: size as u32,
        });
    }
}

impl Drop for RequestBody {
    fn drop(&mut self) {
        // Data left unread still has to give its credit back.
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
            let mut unread = 0;
            while let Ok(message) = receiver.try_recv() {
                if let BodyMessage::Data(data) = message {
                    unread += data.len();
                }
            }
            if unread > 0 {
                self.consumed(unread);
            }
        }
    }
}

/// The body of a response.
///
/// # Examples
///
/// ```
/// use ylong_spdy_mux::Body;
///
/// let full = Body::from("hello");
/// assert!(!full.is_end_stream());
/// assert!(Body::empty().is_end_stream());
///
/// let (sender, body) = Body::channel();
/// sender.send_data("chunk").unwrap();
/// drop(sender);
/// ```
pub struct Body {
    kind: Kind,
}

enum Kind {
    Empty,
    Full(Bytes),
    Channel(UnboundedReceiver<Bytes>),
}

/// Feeds a channel [`Body`]. The body ends when the sender is dropped.
pub struct BodySender {
    sender: UnboundedSender<Bytes>,
}

impl Body {
    /// Creates a body without data.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    /// Creates a body whose data is sent later through the `BodySender`.
    pub fn channel() -> (BodySender, Body) {
        let (tx, rx) = unbounded_channel();
        (
            BodySender { sender: tx },
            Body {
                kind: Kind::Channel(rx),
            },
        )
    }

    /// Whether the body is known to contain no data.
    pub fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Full(data) => data.is_empty(),
            Kind::Channel(_) => false,
        }
    }

    pub(crate) fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        match &mut self.kind {
            Kind::Empty => Poll::Ready(None),
            Kind::Full(_) => {
                let kind = std::mem::replace(&mut self.kind, Kind::Empty);
                match kind {
                    Kind::Full(data) => Poll::Ready(Some(data)),
                    _ => Poll::Ready(None),
                }
            }
            Kind::Channel(receiver) => receiver.poll_recv(cx),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(data: Bytes) -> Self {
        Body {
            kind: Kind::Full(data),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Body::from(Bytes::from(data))
    }
}

impl From<String> for Body {
    fn from(data: String) -> Self {
        Body::from(Bytes::from(data))
    }
}

impl From<&'static str> for Body {
    fn from(data: &'static str) -> Self {
        Body::from(Bytes::from_static(data.as_bytes()))
    }
}

impl BodySender {
    /// Sends a chunk of data; fails if the stream was already closed.
    pub fn send_data<B: Into<Bytes>>(&self, data: B) -> Result<(), MuxError> {
        self.sender
            .send(data.into())
            .map_err(|_| MuxError::new_with_message(ErrorKind::Closed, "Body Receiver Closed !"))
    }

    /// Whether the stream has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod ut_body {
    use bytes::Bytes;

    use crate::body::{Body, BodyMessage, RequestBody};
    use crate::dispatcher::ReqMessage;
    use crate::runtime::unbounded_channel;
    use crate::{ErrorKind, MuxError};

    /// UT test cases for `RequestBody::data`.
    ///
    /// # Brief
    /// 1. Feeds data, trailers and finish into a `RequestBody`.
    /// 2. Reads the body.
    /// 3. Checks the data, trailers and the consumed notifications.
    #[tokio::test]
    async fn ut_request_body_data() {
        let (notifier, mut notified) = unbounded_channel();
        let (tx, mut body) = RequestBody::channel(1, notifier);
        tx.send(BodyMessage::Data(Bytes::from_static(b"hello")))
            .unwrap_or_else(|_| panic!("send"));
        let mut trailers = ylong_spdy::Headers::new();
        trailers.append("checksum", "1");
        tx.send(BodyMessage::Trailers(trailers))
            .unwrap_or_else(|_| panic!("send"));
        tx.send(BodyMessage::Finish)
            .unwrap_or_else(|_| panic!("send"));

        assert_eq!(body.data().await.unwrap().unwrap(), "hello");
        assert!(body.data().await.is_none());
        assert!(body.is_end_stream());
        assert_eq!(body.trailers().unwrap().get("checksum"), Some("1"));
        match notified.try_recv() {
            Ok(ReqMessage::Consumed { id, size }) => {
                assert_eq!(id, 1);
                assert_eq!(size, 5);
            }
            _ => panic!("expected a consumed notification"),
        }
    }

    /// UT test cases for `RequestBody` reset.
    ///
    /// # Brief
    /// 1. Sends an exit message into a `RequestBody`.
    /// 2. Checks that exactly one error is reported.
    #[tokio::test]
    async fn ut_request_body_exit() {
        let (notifier, _notified) = unbounded_channel();
        let (tx, mut body) = RequestBody::channel(3, notifier);
        tx.send(BodyMessage::Exit(MuxError::new_with_message(
            ErrorKind::Closed,
            "reset",
        )))
        .unwrap_or_else(|_| panic!("send"));
        let err = body.data().await.unwrap().unwrap_err();
        assert_eq!(err.error_kind(), ErrorKind::Closed);
        assert!(body.data().await.is_none());
    }

    /// UT test cases for `RequestBody` drop.
    ///
    /// # Brief
    /// 1. Drops a `RequestBody` holding unread data.
    /// 2. Checks that the unread size is reported as consumed.
    #[test]
    fn ut_request_body_drop_releases() {
        let (notifier, mut notified) = unbounded_channel();
        let (tx, body) = RequestBody::channel(5, notifier);
        tx.send(BodyMessage::Data(Bytes::from_static(b"abc")))
            .unwrap_or_else(|_| panic!("send"));
        tx.send(BodyMessage::Data(Bytes::from_static(b"de")))
            .unwrap_or_else(|_| panic!("send"));
        drop(body);
        match notified.try_recv() {
            Ok(ReqMessage::Consumed { id, size }) => {
                assert_eq!(id, 5);
                assert_eq!(size, 5);
            }
            _ => panic!("expected a consumed notification"),
        }
    }

    /// UT test cases for `Body` kinds.
    ///
    /// # Brief
    /// 1. Creates empty, full and channel bodies.
    /// 2. Checks `Body::is_end_stream`.
    #[test]
    fn ut_body_is_end_stream() {
        assert!(Body::empty().is_end_stream());
        assert!(Body::from("").is_end_stream());
        assert!(!Body::from(vec![1u8]).is_end_stream());
        let (sender, body) = Body::channel();
        assert!(!body.is_end_stream());
        drop(body);
        assert!(sender.is_closed());
        assert!(sender.send_data("late").is_err());
    }
}
