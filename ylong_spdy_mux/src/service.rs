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

//! Application boundary of a connection.
//!
//! Every stream opened by the peer is turned into a [`Request`] and handed
//! to a [`Service`], whose [`Response`] is sent back on the same stream.

use std::future::Future;

use ylong_spdy::{Headers, StreamId};

use crate::body::{Body, RequestBody};
use crate::dispatcher::ReqMessage;
use crate::runtime::{oneshot, UnboundedSender};
use crate::{ErrorKind, MuxError};

/// A request received on a stream.
pub struct Request {
    id: StreamId,
    method: String,
    path: String,
    scheme: String,
    version: String,
    headers: Headers,
    body: RequestBody,
    pusher: Pusher,
}

impl Request {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: StreamId,
        method: String,
        path: String,
        scheme: String,
        version: String,
        headers: Headers,
        body: RequestBody,
        pusher: Pusher,
    ) -> Self {
        Self {
            id,
            method,
            path,
            scheme,
            version,
            headers,
            body,
            pusher,
        }
    }

    /// The id of the stream carrying the request.
    pub fn stream_id(&self) -> StreamId {
        self.id
    }

    /// The request method, such as `GET`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The protocol version the peer labelled the request with, if any.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Gets a mutable reference to the request body.
    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }

    /// Takes the request body.
    pub fn into_body(self) -> RequestBody {
        self.body
    }

    /// Gets a handle for pushing streams associated with this request.
    pub fn pusher(&self) -> Pusher {
        self.pusher.clone()
    }
}

/// A response to a [`Request`].
///
/// # Examples
///
/// ```
/// use ylong_spdy_mux::Response;
///
/// let response = Response::new(200)
///     .header("content-type", "text/plain")
///     .body("hello");
/// assert_eq!(response.status(), 200);
/// ```
pub struct Response {
    status: u16,
    headers: Headers,
    body: Body,
    trailers: Option<Headers>,
}

impl Response {
    /// Creates a response with `status` and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::empty(),
            trailers: None,
        }
    }

    /// Appends a header to the response.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the response body.
    pub fn body<B: Into<Body>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Sets trailers, sent in a final HEADERS frame after the body.
    pub fn trailers(mut self, trailers: Headers) -> Self {
        self.trailers = Some(trailers);
        self
    }

    /// Gets the status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Gets the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub(crate) fn into_parts(self) -> (u16, Headers, Body, Option<Headers>) {
        (self.status, self.headers, self.body, self.trailers)
    }
}

/// The request line of a pushed stream.
pub struct PushPromise {
    path: String,
    scheme: String,
    headers: Headers,
}

impl PushPromise {
    /// Creates a promise for `path`, served over `https` unless changed.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            scheme: "https".to_string(),
            headers: Headers::new(),
        }
    }

    /// Sets the scheme of the pushed stream.
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Appends a header to the pushed request.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    pub(crate) fn into_parts(self) -> (String, String, Headers) {
        (self.path, self.scheme, self.headers)
    }
}

/// Pushes streams associated with a request.
#[derive(Clone)]
pub struct Pusher {
    id: StreamId,
    sender: UnboundedSender<ReqMessage>,
}

impl Pusher {
    pub(crate) fn new(id: StreamId, sender: UnboundedSender<ReqMessage>) -> Self {
        Self { id, sender }
    }

    /// Opens a server-initiated stream carrying `response` for `promise` and
    /// returns its id.
    ///
    /// Fails if the associated stream is already finished, the connection is
    /// going away or the concurrency ceiling is reached.
    pub async fn push(
        &self,
        promise: PushPromise,
        response: Response,
    ) -> Result<StreamId, MuxError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ReqMessage::Push {
                associated: self.id,
                promise,
                response,
                tx,
            })
            .map_err(|_| MuxError::new_with_message(ErrorKind::Closed, "Connection Closed !"))?;
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(MuxError::new_with_message(
                ErrorKind::Closed,
                "Connection Closed !",
            )),
        }
    }
}

/// Handles the requests of a connection.
///
/// A service is shared by every stream; each call runs on its own task.
pub trait Service: Send + Sync + 'static {
    /// The future of a response.
    type Future: Future<Output = Result<Response, MuxError>> + Send + 'static;

    /// Serves `request` on its stream.
    fn call(&self, request: Request) -> Self::Future;
}

/// A [`Service`] created from a function.
pub struct ServiceFn<F> {
    f: F,
}

/// Creates a [`Service`] from an async function.
///
/// # Examples
///
/// ```
/// use ylong_spdy_mux::{service_fn, Request, Response, MuxError};
///
/// let service = service_fn(|request: Request| async move {
///     Ok::<_, MuxError>(Response::new(200).body(request.path().to_string()))
/// });
/// # let _ = service;
/// ```
pub fn service_fn<F, Fut>(f: F) -> ServiceFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, MuxError>> + Send + 'static,
{
    ServiceFn { f }
}

impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, MuxError>> + Send + 'static,
{
    type Future = Fut;

    fn call(&self, request: Request) -> Self::Future {
        (self.f)(request)
    }
}

#[cfg(test)]
mod ut_service {
    use ylong_spdy::Headers;

    use crate::body::RequestBody;
    use crate::runtime::unbounded_channel;
    use crate::service::{Pusher, Request};
    use crate::{service_fn, ErrorKind, MuxError, PushPromise, Response, Service};

    fn request(path: &str) -> Request {
        let (notifier, _notified) = unbounded_channel();
        Request::new(
            1,
            "GET".to_string(),
            path.to_string(),
            "https".to_string(),
            "HTTP/1.1".to_string(),
            Headers::new(),
            RequestBody::empty(1, notifier.clone()),
            Pusher::new(1, notifier),
        )
    }

    /// UT test cases for `service_fn`.
    ///
    /// # Brief
    /// 1. Creates a service from a closure.
    /// 2. Calls it and checks the response.
    #[tokio::test]
    async fn ut_service_fn_call() {
        let service = service_fn(|request: Request| async move {
            if request.path() == "/" {
                Ok(Response::new(200).header("Server", "mux"))
            } else {
                Err(MuxError::service("not found"))
            }
        });
        let response = service.call(request("/")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers().get("server"), Some("mux"));
        let err = service.call(request("/missing")).await.err().unwrap();
        assert_eq!(err.error_kind(), ErrorKind::Service);
    }

    /// UT test cases for `Pusher::push` on a closed connection.
    ///
    /// # Brief
    /// 1. Creates a pusher whose connection is gone.
    /// 2. Checks that pushing fails with `ErrorKind::Closed`.
    #[tokio::test]
    async fn ut_pusher_closed() {
        let (sender, receiver) = unbounded_channel();
        drop(receiver);
        let pusher = Pusher::new(1, sender);
        let err = pusher
            .push(PushPromise::new("/style.css"), Response::new(200))
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), ErrorKind::Closed);
    }
}
