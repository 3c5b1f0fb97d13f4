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

//! `ylong_spdy_mux` multiplexes the streams of one SPDY connection.
//!
//! A [`Connection`] reads decoded frames from a [`transport::FrameRead`],
//! writes frames to a [`transport::FrameWrite`] and hands every stream the
//! peer opens to a [`Service`]. It enforces the stream id rules and the
//! concurrency ceiling, keeps the flow control windows of both directions,
//! applies the peer's settings and tears the connection down on fatal
//! errors.
//!
//! # Supported Features
//! - Server and client roles.
//! - Per-stream and per-connection flow control.
//! - Server push.
//! - Orderly shutdown through [`ConnHandle::shutdown`].

mod body;
mod config;
mod dispatcher;
mod error;
mod mux;
mod runtime;
mod service;

pub mod transport;

pub use body::{Body, BodySender, RequestBody};
pub use config::{Role, SpdyConfig};
pub use dispatcher::{ConnHandle, Connection};
pub use error::{ErrorKind, MuxError};
pub use service::{service_fn, PushPromise, Pusher, Request, Response, Service, ServiceFn};

// ylong_spdy crate re-export.
pub use ylong_spdy::{ErrorCode, Frame, FrameFlags, GoAwayStatus, Headers, Payload, StreamId};
