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

//! Negotiation of the settings advertised by the peer.

use tracing::debug;
use ylong_spdy::{SettingId, Settings, SpdyError};

use crate::mux::streams::Streams;

/// Applies the peer's SETTINGS to the streams of a connection.
///
/// Only the concurrency ceiling and the initial window size are acted on.
/// Unrecognised ids and non-positive values leave the connection untouched.
pub(crate) fn apply_settings(streams: &mut Streams, settings: &Settings) -> Result<(), SpdyError> {
    for (id, value) in settings.entries() {
        if *value <= 0 {
            debug!(setting = *id, value = *value, "spdy setting ignored");
            continue;
        }
        match SettingId::from_u32(*id) {
            Some(SettingId::MaxConcurrentStreams) => {
                streams.apply_max_concurrent_streams(*value as u32);
            }
            Some(SettingId::InitialWindowSize) => {
                streams.apply_send_initial_window_size(*value as u32)?;
            }
            _ => {
                debug!(setting = *id, value = *value, "spdy setting ignored");
            }
        }
    }
    Ok(())
}
