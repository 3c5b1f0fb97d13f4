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

//! Definition of `MuxError` which includes errors that may occur in this
//! crate.

use core::fmt::{Debug, Display, Formatter};
use std::error::Error;

use ylong_spdy::{ErrorCode, GoAwayStatus, SpdyError};

/// The structure encapsulates errors that can be encountered when serving a
/// SPDY connection.
pub struct MuxError {
    kind: ErrorKind,
    cause: Option<Box<dyn Error + Send + Sync>>,
}

impl MuxError {
    /// Creates an `Other` error.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ylong_spdy_mux::MuxError;
    ///
    /// # fn error(error: std::io::Error) {
    /// let other = MuxError::other(Some(error));
    /// # }
    /// ```
    pub fn other<T: Into<Box<dyn Error + Send + Sync>>>(cause: Option<T>) -> Self {
        Self {
            kind: ErrorKind::Other,
            cause: cause.map(|e| e.into()),
        }
    }

    /// Creates a `Service` error, used by services to fail a request.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ylong_spdy_mux::{ErrorKind, MuxError};
    ///
    /// let err = MuxError::service("no handler");
    /// assert_eq!(err.error_kind(), ErrorKind::Service);
    /// ```
    pub fn service(message: &str) -> Self {
        Self::new_with_message(ErrorKind::Service, message)
    }

    /// Gets the `ErrorKind` of this `MuxError`.
    pub fn error_kind(&self) -> ErrorKind {
        self.kind
    }

    pub(crate) fn new_with_cause<T>(kind: ErrorKind, cause: Option<T>) -> Self
    where
        T: Into<Box<dyn Error + Send + Sync>>,
    {
        Self {
            kind,
            cause: cause.map(|e| e.into()),
        }
    }

    pub(crate) fn new_with_message(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            cause: Some(CauseMessage::new(message).into()),
        }
    }
}

impl From<SpdyError> for MuxError {
    fn from(err: SpdyError) -> Self {
        let kind = match err {
            SpdyError::StreamError(_, ErrorCode::RefusedStream) => ErrorKind::Refused,
            SpdyError::StreamError(_, ErrorCode::FlowControlError) => ErrorKind::FlowControl,
            SpdyError::StreamError(..) => ErrorKind::Protocol,
            SpdyError::ConnectionError(GoAwayStatus::Ok) => ErrorKind::Closed,
            SpdyError::ConnectionError(_) => ErrorKind::Protocol,
        };
        MuxError::new_with_cause(kind, Some(err))
    }
}

impl Debug for MuxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let mut builder = f.debug_struct("MuxError");
        builder.field("ErrorKind", &self.kind);
        if let Some(ref cause) = self.cause {
            builder.field("Cause", cause);
        }
        builder.finish()
    }
}

impl Display for MuxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.kind.as_str())?;

        if let Some(ref cause) = self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl Error for MuxError {}

/// Error kinds which can indicate the type of a `MuxError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection or stream was closed before the operation completed.
    Closed,

    /// The peer violated flow control.
    FlowControl,

    /// Other error kinds.
    Other,

    /// The peer violated the protocol.
    Protocol,

    /// The stream was refused, for example because of the concurrency limit.
    Refused,

    /// Errors raised by the user service.
    Service,

    /// Errors for reading or writing the transport.
    Transport,
}

impl ErrorKind {
    /// Gets the string info of this `ErrorKind`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ylong_spdy_mux::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::Transport.as_str(), "Transport Error");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "Closed Error",
            Self::FlowControl => "Flow Control Error",
            Self::Other => "Other Error",
            Self::Protocol => "Protocol Error",
            Self::Refused => "Refused Error",
            Self::Service => "Service Error",
            Self::Transport => "Transport Error",
        }
    }
}

/// Messages for summarizing the cause of the error
pub(crate) struct CauseMessage(String);

impl CauseMessage {
    pub(crate) fn new(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl Debug for CauseMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Display for CauseMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for CauseMessage {}

#[cfg(test)]
mod ut_mux_error {
    use ylong_spdy::{ErrorCode, GoAwayStatus, SpdyError};

    use crate::{ErrorKind, MuxError};

    /// UT test cases for `ErrorKind::as_str`.
    ///
    /// # Brief
    /// 1. Transfer ErrorKind to str a by calling `ErrorKind::as_str`.
    /// 2. Checks if the results are correct.
    #[test]
    fn ut_err_as_str() {
        assert_eq!(ErrorKind::Closed.as_str(), "Closed Error");
        assert_eq!(ErrorKind::FlowControl.as_str(), "Flow Control Error");
        assert_eq!(ErrorKind::Other.as_str(), "Other Error");
        assert_eq!(ErrorKind::Protocol.as_str(), "Protocol Error");
        assert_eq!(ErrorKind::Refused.as_str(), "Refused Error");
        assert_eq!(ErrorKind::Service.as_str(), "Service Error");
        assert_eq!(ErrorKind::Transport.as_str(), "Transport Error");
    }

    /// UT test cases for `MuxError::new_with_message` function.
    ///
    /// # Brief
    /// 1. Calls `MuxError::new_with_message`.
    /// 2. Checks the debug and display output.
    #[test]
    fn ut_err_with_message() {
        let err = MuxError::new_with_message(ErrorKind::Closed, "error");
        assert_eq!(err.error_kind(), ErrorKind::Closed);
        assert_eq!(
            format!("{:?}", err),
            "MuxError { ErrorKind: Closed, Cause: error }"
        );
        assert_eq!(format!("{err}"), "Closed Error: error");
    }

    /// UT test cases for `From<SpdyError>`.
    ///
    /// # Brief
    /// 1. Converts stream and connection errors into `MuxError`.
    /// 2. Checks that the error kinds are correct.
    #[test]
    fn ut_err_from_spdy_error() {
        let refused = MuxError::from(SpdyError::StreamError(1, ErrorCode::RefusedStream));
        assert_eq!(refused.error_kind(), ErrorKind::Refused);
        let cancel = MuxError::from(SpdyError::StreamError(1, ErrorCode::Cancel));
        assert_eq!(cancel.error_kind(), ErrorKind::Protocol);
        let closed = MuxError::from(SpdyError::ConnectionError(GoAwayStatus::Ok));
        assert_eq!(closed.error_kind(), ErrorKind::Closed);
        let other = MuxError::other(Some("error"));
        assert_eq!(other.error_kind(), ErrorKind::Other);
    }
}
