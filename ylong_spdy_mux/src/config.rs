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

//! SPDY connection configure module.

use ylong_spdy::frame::{StreamId, DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE};

const DEFAULT_MAX_CONCURRENT_STREAMS: u32 = 100;
const DEFAULT_MAX_DATA_FRAME_SIZE: usize = 16 * 1024;
const DEFAULT_WINDOW_UPDATE_RATIO: u32 = 2;

/// Which end of the connection this side is.
///
/// The role decides the parity of the stream ids this side originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Originates even stream ids.
    Server,
    /// Originates odd stream ids.
    Client,
}

impl Role {
    /// The first id of a stream initiated by this side.
    pub(crate) fn first_local_id(&self) -> StreamId {
        match self {
            Role::Server => 2,
            Role::Client => 1,
        }
    }

    /// Whether `id` has the parity of streams initiated by this side.
    pub(crate) fn is_local_id(&self, id: u32) -> bool {
        match self {
            Role::Server => id % 2 == 0,
            Role::Client => id % 2 == 1,
        }
    }
}

/// Settings which can be used to configure a SPDY connection.
///
/// Every value here is a local preference. The peer's SETTINGS frames
/// override the concurrency ceiling and the initial window size at runtime.
///
/// # Examples
///
/// ```
/// use ylong_spdy_mux::{Role, SpdyConfig};
///
/// let config = SpdyConfig::new(Role::Server)
///     .stream_window_size(256 * 1024)
///     .max_concurrent_streams(Some(32));
/// assert_eq!(config.role(), Role::Server);
/// ```
#[derive(Clone, Debug)]
pub struct SpdyConfig {
    pub(crate) role: Role,
    pub(crate) stream_window_size: u32,
    pub(crate) conn_window_size: u32,
    pub(crate) max_concurrent_streams: Option<u32>,
    pub(crate) max_data_frame_size: usize,
    pub(crate) window_update_ratio: u32,
}

impl SpdyConfig {
    /// `SpdyConfig` constructor.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            stream_window_size: DEFAULT_WINDOW_SIZE,
            conn_window_size: DEFAULT_WINDOW_SIZE,
            max_concurrent_streams: Some(DEFAULT_MAX_CONCURRENT_STREAMS),
            max_data_frame_size: DEFAULT_MAX_DATA_FRAME_SIZE,
            window_update_ratio: DEFAULT_WINDOW_UPDATE_RATIO,
        }
    }

    /// Sets the receive window advertised for every stream.
    pub fn stream_window_size(mut self, size: u32) -> Self {
        self.stream_window_size = size.clamp(1, MAX_WINDOW_SIZE);
        self
    }

    /// Sets the receive window of the connection.
    pub fn conn_window_size(mut self, size: u32) -> Self {
        self.conn_window_size = size.clamp(1, MAX_WINDOW_SIZE);
        self
    }

    /// Sets the concurrency ceiling advertised to the peer and applied until
    /// the peer advertises its own. `None` means unbounded.
    pub fn max_concurrent_streams(mut self, num: Option<u32>) -> Self {
        self.max_concurrent_streams = num.filter(|n| *n > 0);
        self
    }

    /// Sets the largest DATA payload this side emits.
    pub fn max_data_frame_size(mut self, size: usize) -> Self {
        self.max_data_frame_size = size.max(1);
        self
    }

    /// Sets how eagerly consumed credit is returned: a WINDOW_UPDATE is sent
    /// once `1 / ratio` of a window has been consumed.
    pub fn window_update_ratio(mut self, ratio: u32) -> Self {
        self.window_update_ratio = ratio.max(1);
        self
    }

    /// Gets the role of this side.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Gets the receive window advertised for every stream.
    pub fn get_stream_window_size(&self) -> u32 {
        self.stream_window_size
    }

    /// Gets the receive window of the connection.
    pub fn get_conn_window_size(&self) -> u32 {
        self.conn_window_size
    }

    /// Gets the local concurrency ceiling, `None` if unbounded.
    pub fn get_max_concurrent_streams(&self) -> Option<u32> {
        self.max_concurrent_streams
    }

    /// Gets the largest DATA payload this side emits.
    pub fn get_max_data_frame_size(&self) -> usize {
        self.max_data_frame_size
    }

    /// Gets the window update ratio.
    pub fn get_window_update_ratio(&self) -> u32 {
        self.window_update_ratio
    }
}

impl Default for SpdyConfig {
    fn default() -> Self {
        Self::new(Role::Server)
    }
}
