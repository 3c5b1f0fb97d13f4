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

//! SPDY error definitions.
//!
//! Errors are split the same way the protocol signals them to the peer:
//! - [`ErrorCode`] is carried by a `RST_STREAM` frame and only affects one
//!   stream.
//! - [`GoAwayStatus`] is carried by a `GOAWAY` frame and ends the whole
//!   connection.

use core::fmt::{Display, Formatter};
use std::convert::TryFrom;
use std::error::Error;

use crate::frame::StreamId;

/// Errors that can be raised while handling a SPDY connection.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum SpdyError {
    /// Error that only abandons one stream, signalled with `RST_STREAM`.
    StreamError(StreamId, ErrorCode),
    /// Error that terminates the connection, signalled with `GOAWAY`.
    ConnectionError(GoAwayStatus),
}

/// Status codes of the `RST_STREAM` frame.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ErrorCode {
    /// A generic error, used when no more specific code applies.
    ProtocolError = 0x01,

    /// A frame was received for a stream that is not active.
    InvalidStream = 0x02,

    /// The stream was refused before any processing was done on it.
    RefusedStream = 0x03,

    /// The recipient does not support the SPDY version requested.
    UnsupportedVersion = 0x04,

    /// The stream is no longer needed.
    Cancel = 0x05,

    /// A generic error which can be used when the implementation has
    /// internally failed.
    InternalError = 0x06,

    /// The peer violated the flow control protocol.
    FlowControlError = 0x07,

    /// A `SYN_STREAM` was received for a stream that is already open.
    StreamInUse = 0x08,

    /// Data or a `SYN_REPLY` was received for a half-closed stream.
    StreamAlreadyClosed = 0x09,

    /// The frame exceeds the size the endpoint is able to process.
    FrameTooLarge = 0x0b,
}

impl ErrorCode {
    /// Gets the status code of this `ErrorCode`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ylong_spdy::error::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::Cancel.into_code(), 5);
    /// ```
    pub fn into_code(self) -> u32 {
        self as u32
    }

    /// Gets the string info of this `ErrorCode`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::InvalidStream => "INVALID_STREAM",
            Self::RefusedStream => "REFUSED_STREAM",
            Self::UnsupportedVersion => "UNSUPPORTED_VERSION",
            Self::Cancel => "CANCEL",
            Self::InternalError => "INTERNAL_ERROR",
            Self::FlowControlError => "FLOW_CONTROL_ERROR",
            Self::StreamInUse => "STREAM_IN_USE",
            Self::StreamAlreadyClosed => "STREAM_ALREADY_CLOSED",
            Self::FrameTooLarge => "FRAME_TOO_LARGE",
        }
    }
}

impl TryFrom<u32> for ErrorCode {
    type Error = SpdyError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let code = match value {
            0x01 => ErrorCode::ProtocolError,
            0x02 => ErrorCode::InvalidStream,
            0x03 => ErrorCode::RefusedStream,
            0x04 => ErrorCode::UnsupportedVersion,
            0x05 => ErrorCode::Cancel,
            0x06 => ErrorCode::InternalError,
            0x07 => ErrorCode::FlowControlError,
            0x08 => ErrorCode::StreamInUse,
            0x09 => ErrorCode::StreamAlreadyClosed,
            0x0b => ErrorCode::FrameTooLarge,
            _ => return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError)),
        };
        Ok(code)
    }
}

/// Status codes of the `GOAWAY` frame.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum GoAwayStatus {
    /// Normal session teardown.
    Ok = 0x00,

    /// A generic error, used when no more specific status applies.
    ProtocolError = 0x01,

    /// The implementation has internally failed.
    InternalError = 0x0b,
}

impl GoAwayStatus {
    /// Gets the status code of this `GoAwayStatus`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ylong_spdy::error::GoAwayStatus;
    ///
    /// assert_eq!(GoAwayStatus::InternalError.into_code(), 11);
    /// ```
    pub fn into_code(self) -> u32 {
        self as u32
    }

    /// Gets the string info of this `GoAwayStatus`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl TryFrom<u32> for GoAwayStatus {
    type Error = SpdyError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(GoAwayStatus::Ok),
            0x01 => Ok(GoAwayStatus::ProtocolError),
            0x0b => Ok(GoAwayStatus::InternalError),
            _ => Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError)),
        }
    }
}

impl Display for SpdyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            SpdyError::StreamError(id, code) => {
                write!(f, "stream {id} reset: {}", code.as_str())
            }
            SpdyError::ConnectionError(status) => {
                write!(f, "connection going away: {}", status.as_str())
            }
        }
    }
}

impl Error for SpdyError {}
