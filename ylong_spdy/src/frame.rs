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

//! SPDY frame definitions.
//!
//! Frames are modelled as decoded values. Turning them into bytes is the job
//! of a codec sitting on the transport, which is not part of this crate.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::{ErrorCode, GoAwayStatus};
use crate::headers::Headers;

/// Stream identifier. `0` addresses the connection itself.
pub type StreamId = u32;

/// Largest stream id that can be carried in 31 bits.
pub const MAX_STREAM_ID: StreamId = u32::MAX >> 1;

/// Largest value a flow control window may reach.
pub const MAX_WINDOW_SIZE: u32 = u32::MAX >> 1;

/// Window size of every stream and of the connection before any SETTINGS.
pub const DEFAULT_WINDOW_SIZE: u32 = 64 * 1024;

const FLAG_FIN: u8 = 0x01;
const FLAG_UNIDIRECTIONAL: u8 = 0x02;

/// A SPDY frame.
///
/// # Examples
///
/// ```
/// use ylong_spdy::frame::{Frame, Payload};
///
/// let frame = Frame::data(1, "hello", true);
/// assert_eq!(frame.stream_id(), 1);
/// assert!(frame.flags().is_fin());
/// assert!(matches!(frame.payload(), Payload::Data(_)));
/// ```
#[derive(Clone, Debug)]
pub struct Frame {
    id: StreamId,
    flags: FrameFlags,
    payload: Payload,
}

/// Flags of a frame header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

/// Frame payloads, one per frame kind.
#[derive(Clone, Debug)]
pub enum Payload {
    /// SYN_STREAM: opens a new stream.
    SynStream(SynStream),
    /// SYN_REPLY: response headers of a stream.
    SynReply(SynReply),
    /// HEADERS: additional headers, used for trailers.
    Headers(HeaderBlock),
    /// DATA frame payload.
    Data(Data),
    /// WINDOW_UPDATE frame payload.
    WindowUpdate(WindowUpdate),
    /// PING frame payload.
    Ping(Ping),
    /// SETTINGS frame payload.
    Settings(Settings),
    /// RST_STREAM frame payload.
    RstStream(RstStream),
    /// GOAWAY frame payload.
    Goaway(Goaway),
    /// A frame kind this crate does not know about.
    Unknown(Unknown),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynStream {
    associated_id: StreamId,
    method: String,
    path: String,
    scheme: String,
    version: String,
    headers: Headers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynReply {
    status: u16,
    version: String,
    headers: Headers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderBlock {
    headers: Headers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Data {
    data: Bytes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowUpdate {
    delta: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ping {
    id: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    entries: BTreeMap<u32, i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RstStream {
    code: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Goaway {
    last_stream_id: StreamId,
    status: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unknown {
    raw_type: u16,
}

/// Identifiers of the SETTINGS entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingId {
    UploadBandwidth = 1,
    DownloadBandwidth = 2,
    RoundTripTime = 3,
    MaxConcurrentStreams = 4,
    CurrentCwnd = 5,
    DownloadRetransRate = 6,
    InitialWindowSize = 7,
    ClientCertificateVectorSize = 8,
}

impl Frame {
    /// Creates a `Frame` from its parts.
    pub fn new(id: StreamId, flags: FrameFlags, payload: Payload) -> Self {
        Frame { id, flags, payload }
    }

    /// Creates a SYN_STREAM frame.
    pub fn syn_stream(id: StreamId, syn: SynStream, fin: bool) -> Self {
        let mut flags = FrameFlags::empty();
        flags.set_fin(fin);
        Frame::new(id, flags, Payload::SynStream(syn))
    }

    /// Creates a DATA frame.
    pub fn data<B: Into<Bytes>>(id: StreamId, data: B, fin: bool) -> Self {
        let mut flags = FrameFlags::empty();
        flags.set_fin(fin);
        Frame::new(id, flags, Payload::Data(Data::new(data.into())))
    }

    /// Creates a HEADERS frame.
    pub fn headers(id: StreamId, headers: Headers, fin: bool) -> Self {
        let mut flags = FrameFlags::empty();
        flags.set_fin(fin);
        Frame::new(id, flags, Payload::Headers(HeaderBlock::new(headers)))
    }

    /// Creates a WINDOW_UPDATE frame. Stream id `0` targets the connection.
    pub fn window_update(id: StreamId, delta: u32) -> Self {
        Frame::new(
            id,
            FrameFlags::empty(),
            Payload::WindowUpdate(WindowUpdate::new(delta)),
        )
    }

    /// Creates a PING frame.
    pub fn ping(ping_id: u32) -> Self {
        Frame::new(0, FrameFlags::empty(), Payload::Ping(Ping::new(ping_id)))
    }

    /// Creates a SETTINGS frame.
    pub fn settings(settings: Settings) -> Self {
        Frame::new(0, FrameFlags::empty(), Payload::Settings(settings))
    }

    /// Creates a RST_STREAM frame.
    pub fn rst_stream(id: StreamId, code: ErrorCode) -> Self {
        Frame::new(
            id,
            FrameFlags::empty(),
            Payload::RstStream(RstStream::new(code.into_code())),
        )
    }

    /// Creates a GOAWAY frame.
    pub fn go_away(last_stream_id: StreamId, status: GoAwayStatus) -> Self {
        Frame::new(
            0,
            FrameFlags::empty(),
            Payload::Goaway(Goaway::new(last_stream_id, status.into_code())),
        )
    }

    pub fn stream_id(&self) -> StreamId {
        self.id
    }

    pub fn flags(&self) -> &FrameFlags {
        &self.flags
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

impl FrameFlags {
    pub fn new(flags: u8) -> Self {
        FrameFlags(flags)
    }

    pub fn empty() -> Self {
        FrameFlags(0)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Whether this is the last frame the sender sends on the stream.
    pub fn is_fin(&self) -> bool {
        self.0 & FLAG_FIN == FLAG_FIN
    }

    pub fn set_fin(&mut self, fin: bool) {
        if fin {
            self.0 |= FLAG_FIN;
        } else {
            self.0 &= !FLAG_FIN;
        }
    }

    /// Whether a SYN_STREAM opens a stream the recipient cannot send on.
    pub fn is_unidirectional(&self) -> bool {
        self.0 & FLAG_UNIDIRECTIONAL == FLAG_UNIDIRECTIONAL
    }

    pub fn set_unidirectional(&mut self, unidirectional: bool) {
        if unidirectional {
            self.0 |= FLAG_UNIDIRECTIONAL;
        } else {
            self.0 &= !FLAG_UNIDIRECTIONAL;
        }
    }
}

impl SynStream {
    /// Creates a `SynStream` with the request line carried by SPDY pseudo
    /// headers.
    pub fn new(method: &str, path: &str, scheme: &str, headers: Headers) -> Self {
        Self {
            associated_id: 0,
            method: method.to_string(),
            path: path.to_string(),
            scheme: scheme.to_string(),
            version: String::new(),
            headers,
        }
    }

    /// Associates a pushed stream with the stream that triggered it.
    pub fn with_associated_id(mut self, id: StreamId) -> Self {
        self.associated_id = id;
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn associated_id(&self) -> StreamId {
        self.associated_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The protocol version of the request, empty if the peer sent none.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn into_headers(self) -> Headers {
        self.headers
    }
}

impl SynReply {
    pub fn new(status: u16, version: &str, headers: Headers) -> Self {
        Self {
            status,
            version: version.to_string(),
            headers,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

impl HeaderBlock {
    pub fn new(headers: Headers) -> Self {
        Self { headers }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn into_headers(self) -> Headers {
        self.headers
    }
}

impl Data {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Length of the payload, which is what flow control accounts for.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl WindowUpdate {
    pub fn new(delta: u32) -> Self {
        Self { delta }
    }

    pub fn get_delta(&self) -> u32 {
        self.delta
    }
}

impl Ping {
    pub fn new(id: u32) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an entry by its raw id. Values are kept signed so that a
    /// non-positive value survives decoding and can be ignored by the
    /// receiver.
    pub fn set_by_id(&mut self, id: u32, value: i32) {
        self.entries.insert(id, value);
    }

    pub fn set(&mut self, id: SettingId, value: i32) {
        self.set_by_id(id as u32, value);
    }

    /// Builder-style variant of [`Settings::set`].
    pub fn with(mut self, id: SettingId, value: i32) -> Self {
        self.set(id, value);
        self
    }

    pub fn get(&self, id: SettingId) -> Option<i32> {
        self.entries.get(&(id as u32)).copied()
    }

    pub fn entries(&self) -> &BTreeMap<u32, i32> {
        &self.entries
    }
}

impl SettingId {
    pub fn from_u32(id: u32) -> Option<Self> {
        let id = match id {
            1 => SettingId::UploadBandwidth,
            2 => SettingId::DownloadBandwidth,
            3 => SettingId::RoundTripTime,
            4 => SettingId::MaxConcurrentStreams,
            5 => SettingId::CurrentCwnd,
            6 => SettingId::DownloadRetransRate,
            7 => SettingId::InitialWindowSize,
            8 => SettingId::ClientCertificateVectorSize,
            _ => return None,
        };
        Some(id)
    }
}

impl RstStream {
    pub fn new(code: u32) -> Self {
        Self { code }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    /// Status code as an [`ErrorCode`], `None` when the code is unassigned.
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::try_from(self.code).ok()
    }
}

impl Goaway {
    pub fn new(last_stream_id: StreamId, status: u32) -> Self {
        Self {
            last_stream_id,
            status,
        }
    }

    pub fn get_last_stream_id(&self) -> StreamId {
        self.last_stream_id
    }

    pub fn get_status(&self) -> u32 {
        self.status
    }
}

impl Unknown {
    pub fn new(raw_type: u16) -> Self {
        Self { raw_type }
    }

    pub fn raw_type(&self) -> u16 {
        self.raw_type
    }
}
