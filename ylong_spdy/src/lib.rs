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

//! `ylong_spdy` provides the value types of the SPDY protocol: frames,
//! header blocks, settings and error codes.
//!
//! Frames are exchanged as decoded values; the byte-level codec is provided
//! by the transport.

pub mod error;
pub mod frame;
pub mod headers;

pub use error::{ErrorCode, GoAwayStatus, SpdyError};
pub use frame::{Frame, FrameFlags, Payload, SettingId, Settings, StreamId};
pub use headers::Headers;
