//! HTTP/2 frame model and wire codec (RFC 7540 Sections 4 and 6).
//!
//! Every frame kind is a plain struct collected in the [`Frame`] sum type.
//! `parse` functions validate one complete payload; buffering and
//! CONTINUATION assembly live in [`crate::h2_codec`].

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ErrorCode, ErrorKind, H2Error};

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 9;

/// Default and minimum SETTINGS_MAX_FRAME_SIZE.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;

/// Largest legal SETTINGS_MAX_FRAME_SIZE (2^24 - 1).
pub const MAX_MAX_FRAME_SIZE: u32 = 16_777_215;

/// Largest stream id and window size (2^31 - 1).
pub const MAX_STREAM_ID: u32 = 0x7fff_ffff;

/// HTTP/2 frame types (RFC 7540 Section 6)
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;

    /// Wire name, for logging.
    pub fn name(frame_type: u8) -> &'static str {
        match frame_type {
            DATA => "DATA",
            HEADERS => "HEADERS",
            PRIORITY => "PRIORITY",
            RST_STREAM => "RST_STREAM",
            SETTINGS => "SETTINGS",
            PUSH_PROMISE => "PUSH_PROMISE",
            PING => "PING",
            GOAWAY => "GOAWAY",
            WINDOW_UPDATE => "WINDOW_UPDATE",
            CONTINUATION => "CONTINUATION",
            _ => "UNKNOWN",
        }
    }

    pub fn is_known(frame_type: u8) -> bool {
        frame_type <= CONTINUATION
    }
}

/// HTTP/2 frame flags
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    /// SETTINGS and PING share bit 0 for ACK.
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

/// HTTP/2 SETTINGS identifiers (RFC 7540 Section 6.5.2)
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// A parsed HTTP/2 frame header (9 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: u8,
    pub flags: u8,
    /// 31 bits; the reserved bit is dropped on parse.
    pub stream_id: u32,
}

impl FrameHeader {
    /// Parse the first 9 bytes of `data`.
    ///
    /// A short buffer is [`ErrorKind::FrameHeaderParse`]: wait for more bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ErrorKind> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(ErrorKind::FrameHeaderParse {
                available: data.len(),
            });
        }
        let mut buf = &data[..FRAME_HEADER_SIZE];
        let length = buf.get_uint(3) as u32;
        let frame_type = buf.get_u8();
        let flags = buf.get_u8();
        let stream_id = buf.get_u32() & MAX_STREAM_ID;
        Ok(Self {
            length,
            frame_type,
            flags,
            stream_id,
        })
    }

    pub fn write(&self, dst: &mut BytesMut) {
        dst.reserve(FRAME_HEADER_SIZE + self.length as usize);
        dst.put_uint(u64::from(self.length), 3);
        dst.put_u8(self.frame_type);
        dst.put_u8(self.flags);
        dst.put_u32(self.stream_id & MAX_STREAM_ID);
    }

    /// Total frame size including header
    pub fn total_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.length as usize
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn is_end_stream(&self) -> bool {
        self.has_flag(flags::END_STREAM)
    }

    pub fn is_end_headers(&self) -> bool {
        self.has_flag(flags::END_HEADERS)
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(DataFrame),
    Headers(HeadersFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    Settings(SettingsFrame),
    PushPromise(PushPromiseFrame),
    Ping(PingFrame),
    GoAway(GoAwayFrame),
    WindowUpdate(WindowUpdateFrame),
    Continuation(ContinuationFrame),
}

impl Frame {
    pub fn stream_id(&self) -> u32 {
        match self {
            Self::Data(f) => f.stream_id,
            Self::Headers(f) => f.stream_id,
            Self::Priority(f) => f.stream_id,
            Self::RstStream(f) => f.stream_id,
            Self::PushPromise(f) => f.stream_id,
            Self::WindowUpdate(f) => f.stream_id,
            Self::Continuation(f) => f.stream_id,
            Self::Settings(_) | Self::Ping(_) | Self::GoAway(_) => 0,
        }
    }

    pub fn frame_type(&self) -> u8 {
        match self {
            Self::Data(_) => frame_type::DATA,
            Self::Headers(_) => frame_type::HEADERS,
            Self::Priority(_) => frame_type::PRIORITY,
            Self::RstStream(_) => frame_type::RST_STREAM,
            Self::Settings(_) => frame_type::SETTINGS,
            Self::PushPromise(_) => frame_type::PUSH_PROMISE,
            Self::Ping(_) => frame_type::PING,
            Self::GoAway(_) => frame_type::GOAWAY,
            Self::WindowUpdate(_) => frame_type::WINDOW_UPDATE,
            Self::Continuation(_) => frame_type::CONTINUATION,
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Data(f) => f.encode(dst),
            Self::Headers(f) => f.encode(dst),
            Self::Priority(f) => f.encode(dst),
            Self::RstStream(f) => f.encode(dst),
            Self::Settings(f) => f.encode(dst),
            Self::PushPromise(f) => f.encode(dst),
            Self::Ping(f) => f.encode(dst),
            Self::GoAway(f) => f.encode(dst),
            Self::WindowUpdate(f) => f.encode(dst),
            Self::Continuation(f) => f.encode(dst),
        }
    }

    /// Parse one complete frame of a known type.
    pub fn parse(header: &FrameHeader, payload: Bytes) -> Result<Self, H2Error> {
        Ok(match header.frame_type {
            frame_type::DATA => Self::Data(DataFrame::parse(header, payload)?),
            frame_type::HEADERS => Self::Headers(HeadersFrame::parse(header, payload)?),
            frame_type::PRIORITY => Self::Priority(PriorityFrame::parse(header, payload)?),
            frame_type::RST_STREAM => Self::RstStream(RstStreamFrame::parse(header, payload)?),
            frame_type::SETTINGS => Self::Settings(SettingsFrame::parse(header, payload)?),
            frame_type::PUSH_PROMISE => Self::PushPromise(PushPromiseFrame::parse(header, payload)?),
            frame_type::PING => Self::Ping(PingFrame::parse(header, payload)?),
            frame_type::GOAWAY => Self::GoAway(GoAwayFrame::parse(header, payload)?),
            frame_type::WINDOW_UPDATE => Self::WindowUpdate(WindowUpdateFrame::parse(header, payload)?),
            frame_type::CONTINUATION => Self::Continuation(ContinuationFrame::parse(header, payload)?),
            other => {
                return Err(H2Error::protocol(format!("unknown frame type {other:#x}")));
            }
        })
    }
}

fn require_stream(header: &FrameHeader, frame: &'static str) -> Result<(), H2Error> {
    if header.stream_id == 0 {
        return Err(H2Error::protocol(format!("{frame} frame on stream 0")));
    }
    Ok(())
}

fn require_connection(header: &FrameHeader, frame: &'static str) -> Result<(), H2Error> {
    if header.stream_id != 0 {
        return Err(H2Error::protocol(format!(
            "{frame} frame on stream {}",
            header.stream_id
        )));
    }
    Ok(())
}

fn malformed(frame: &'static str) -> H2Error {
    H2Error::connection(ErrorKind::MalformedFrame { frame })
}

/// Remove the Pad Length byte and trailing padding.
fn strip_padding(header: &FrameHeader, mut payload: Bytes, frame: &'static str) -> Result<Bytes, H2Error> {
    if !header.has_flag(flags::PADDED) {
        return Ok(payload);
    }
    if payload.is_empty() {
        return Err(malformed(frame));
    }
    let pad_length = usize::from(payload.get_u8());
    if pad_length > payload.len() {
        return Err(H2Error::protocol(format!("{frame} padding exceeds payload")));
    }
    payload.truncate(payload.len() - pad_length);
    Ok(payload)
}

/// DATA frame (type 0x0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub stream_id: u32,
    pub data: Bytes,
    pub end_stream: bool,
    /// Bytes charged to flow control, padding included.
    pub flow_controlled_len: u32,
}

impl DataFrame {
    pub fn new(stream_id: u32, data: Bytes, end_stream: bool) -> Self {
        Self {
            stream_id,
            flow_controlled_len: data.len() as u32,
            data,
            end_stream,
        }
    }

    pub fn parse(header: &FrameHeader, payload: Bytes) -> Result<Self, H2Error> {
        require_stream(header, "DATA")?;
        Ok(Self {
            stream_id: header.stream_id,
            data: strip_padding(header, payload, "DATA")?,
            end_stream: header.is_end_stream(),
            flow_controlled_len: header.length,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: self.data.len() as u32,
            frame_type: frame_type::DATA,
            flags: if self.end_stream { flags::END_STREAM } else { 0 },
            stream_id: self.stream_id,
        }
        .write(dst);
        dst.put_slice(&self.data);
    }
}

/// Stream dependency and weight carried by HEADERS and PRIORITY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySpec {
    pub dependency: u32,
    /// 1..=256
    pub weight: u16,
    pub exclusive: bool,
}

impl Default for PrioritySpec {
    fn default() -> Self {
        Self {
            dependency: 0,
            weight: 16,
            exclusive: false,
        }
    }
}

impl PrioritySpec {
    /// Read the 5-byte dependency/weight block. Never fails; callers check
    /// self-dependency at the point where they can report it.
    fn read(buf: &mut Bytes) -> Self {
        let raw = buf.get_u32();
        Self {
            dependency: raw & MAX_STREAM_ID,
            weight: u16::from(buf.get_u8()) + 1,
            exclusive: raw & 0x8000_0000 != 0,
        }
    }

    /// A stream may not depend on itself (RFC 7540 Section 5.3.1).
    pub fn is_self_dependent(&self, stream_id: u32) -> bool {
        self.dependency == stream_id
    }

    fn write(&self, dst: &mut BytesMut) {
        let exclusive = if self.exclusive { 0x8000_0000 } else { 0 };
        dst.put_u32(self.dependency | exclusive);
        dst.put_u8((self.weight.clamp(1, 256) - 1) as u8);
    }
}

/// HEADERS frame (type 0x1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersFrame {
    pub stream_id: u32,
    /// HPACK-encoded fragment; the whole block once reassembled.
    pub header_block: Bytes,
    pub end_stream: bool,
    pub end_headers: bool,
    pub priority: Option<PrioritySpec>,
}

impl HeadersFrame {
    pub fn new(stream_id: u32, header_block: Bytes, end_stream: bool, end_headers: bool) -> Self {
        Self {
            stream_id,
            header_block,
            end_stream,
            end_headers,
            priority: None,
        }
    }

    pub fn parse(header: &FrameHeader, payload: Bytes) -> Result<Self, H2Error> {
        require_stream(header, "HEADERS")?;
        let mut payload = strip_padding(header, payload, "HEADERS")?;
        let priority = if header.has_flag(flags::PRIORITY) {
            if payload.len() < 5 {
                return Err(malformed("HEADERS"));
            }
            // Self-dependency is left to the connection: the header block
            // must still reach the HPACK decoder.
            Some(PrioritySpec::read(&mut payload))
        } else {
            None
        };
        Ok(Self {
            stream_id: header.stream_id,
            header_block: payload,
            end_stream: header.is_end_stream(),
            end_headers: header.is_end_headers(),
            priority,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        let mut frame_flags = 0;
        if self.end_stream {
            frame_flags |= flags::END_STREAM;
        }
        if self.end_headers {
            frame_flags |= flags::END_HEADERS;
        }
        let mut length = self.header_block.len() as u32;
        if self.priority.is_some() {
            frame_flags |= flags::PRIORITY;
            length += 5;
        }
        FrameHeader {
            length,
            frame_type: frame_type::HEADERS,
            flags: frame_flags,
            stream_id: self.stream_id,
        }
        .write(dst);
        if let Some(priority) = &self.priority {
            priority.write(dst);
        }
        dst.put_slice(&self.header_block);
    }
}

/// PRIORITY frame (type 0x2). Recorded, never acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityFrame {
    pub stream_id: u32,
    pub priority: PrioritySpec,
}

impl PriorityFrame {
    pub fn parse(header: &FrameHeader, mut payload: Bytes) -> Result<Self, H2Error> {
        require_stream(header, "PRIORITY")?;
        if payload.len() != 5 {
            return Err(H2Error::stream(
                header.stream_id,
                ErrorKind::MalformedFrame { frame: "PRIORITY" },
            ));
        }
        let priority = PrioritySpec::read(&mut payload);
        if priority.is_self_dependent(header.stream_id) {
            return Err(H2Error::stream_with(
                header.stream_id,
                ErrorCode::ProtocolError,
                ErrorKind::Protocol("stream depends on itself".into()),
            ));
        }
        Ok(Self {
            stream_id: header.stream_id,
            priority,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: 5,
            frame_type: frame_type::PRIORITY,
            flags: 0,
            stream_id: self.stream_id,
        }
        .write(dst);
        self.priority.write(dst);
    }
}

/// RST_STREAM frame (type 0x3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RstStreamFrame {
    pub stream_id: u32,
    pub error_code: ErrorCode,
}

impl RstStreamFrame {
    pub fn new(stream_id: u32, error_code: ErrorCode) -> Self {
        Self { stream_id, error_code }
    }

    pub fn parse(header: &FrameHeader, mut payload: Bytes) -> Result<Self, H2Error> {
        require_stream(header, "RST_STREAM")?;
        if payload.len() != 4 {
            return Err(malformed("RST_STREAM"));
        }
        Ok(Self {
            stream_id: header.stream_id,
            error_code: ErrorCode::from_u32(payload.get_u32()),
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: 4,
            frame_type: frame_type::RST_STREAM,
            flags: 0,
            stream_id: self.stream_id,
        }
        .write(dst);
        dst.put_u32(self.error_code.into());
    }
}

/// A single SETTINGS parameter with a known identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    HeaderTableSize(u32),
    EnablePush(u32),
    MaxConcurrentStreams(u32),
    InitialWindowSize(u32),
    MaxFrameSize(u32),
    MaxHeaderListSize(u32),
}

impl Setting {
    /// `None` for identifiers this endpoint does not understand.
    pub fn from_id_value(id: u16, value: u32) -> Option<Self> {
        Some(match id {
            settings_id::HEADER_TABLE_SIZE => Self::HeaderTableSize(value),
            settings_id::ENABLE_PUSH => Self::EnablePush(value),
            settings_id::MAX_CONCURRENT_STREAMS => Self::MaxConcurrentStreams(value),
            settings_id::INITIAL_WINDOW_SIZE => Self::InitialWindowSize(value),
            settings_id::MAX_FRAME_SIZE => Self::MaxFrameSize(value),
            settings_id::MAX_HEADER_LIST_SIZE => Self::MaxHeaderListSize(value),
            _ => return None,
        })
    }

    pub fn id(&self) -> u16 {
        match self {
            Self::HeaderTableSize(_) => settings_id::HEADER_TABLE_SIZE,
            Self::EnablePush(_) => settings_id::ENABLE_PUSH,
            Self::MaxConcurrentStreams(_) => settings_id::MAX_CONCURRENT_STREAMS,
            Self::InitialWindowSize(_) => settings_id::INITIAL_WINDOW_SIZE,
            Self::MaxFrameSize(_) => settings_id::MAX_FRAME_SIZE,
            Self::MaxHeaderListSize(_) => settings_id::MAX_HEADER_LIST_SIZE,
        }
    }

    pub fn value(&self) -> u32 {
        match *self {
            Self::HeaderTableSize(v)
            | Self::EnablePush(v)
            | Self::MaxConcurrentStreams(v)
            | Self::InitialWindowSize(v)
            | Self::MaxFrameSize(v)
            | Self::MaxHeaderListSize(v) => v,
        }
    }
}

/// SETTINGS frame (type 0x4).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsFrame {
    pub ack: bool,
    /// Known settings in wire order; unknown identifiers are dropped.
    pub settings: Vec<Setting>,
}

impl SettingsFrame {
    pub fn new(settings: Vec<Setting>) -> Self {
        Self { ack: false, settings }
    }

    pub fn ack() -> Self {
        Self {
            ack: true,
            settings: Vec::new(),
        }
    }

    pub fn parse(header: &FrameHeader, mut payload: Bytes) -> Result<Self, H2Error> {
        require_connection(header, "SETTINGS")?;
        let ack = header.has_flag(flags::ACK);
        if (ack && !payload.is_empty()) || payload.len() % 6 != 0 {
            return Err(malformed("SETTINGS"));
        }
        let mut settings = Vec::with_capacity(payload.len() / 6);
        while payload.has_remaining() {
            let id = payload.get_u16();
            let value = payload.get_u32();
            match Setting::from_id_value(id, value) {
                Some(setting) => settings.push(setting),
                None => tracing::trace!(id, value, "ignoring unknown setting"),
            }
        }
        Ok(Self { ack, settings })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: (self.settings.len() * 6) as u32,
            frame_type: frame_type::SETTINGS,
            flags: if self.ack { flags::ACK } else { 0 },
            stream_id: 0,
        }
        .write(dst);
        for setting in &self.settings {
            dst.put_u16(setting.id());
            dst.put_u32(setting.value());
        }
    }
}

/// PUSH_PROMISE frame (type 0x5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPromiseFrame {
    pub stream_id: u32,
    pub promised_stream_id: u32,
    pub header_block: Bytes,
    pub end_headers: bool,
}

impl PushPromiseFrame {
    pub fn parse(header: &FrameHeader, payload: Bytes) -> Result<Self, H2Error> {
        require_stream(header, "PUSH_PROMISE")?;
        let mut payload = strip_padding(header, payload, "PUSH_PROMISE")?;
        if payload.len() < 4 {
            return Err(malformed("PUSH_PROMISE"));
        }
        let promised_stream_id = payload.get_u32() & MAX_STREAM_ID;
        Ok(Self {
            stream_id: header.stream_id,
            promised_stream_id,
            header_block: payload,
            end_headers: header.is_end_headers(),
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: 4 + self.header_block.len() as u32,
            frame_type: frame_type::PUSH_PROMISE,
            flags: if self.end_headers { flags::END_HEADERS } else { 0 },
            stream_id: self.stream_id,
        }
        .write(dst);
        dst.put_u32(self.promised_stream_id & MAX_STREAM_ID);
        dst.put_slice(&self.header_block);
    }
}

/// PING frame (type 0x6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingFrame {
    pub ack: bool,
    pub data: [u8; 8],
}

impl PingFrame {
    pub fn parse(header: &FrameHeader, payload: Bytes) -> Result<Self, H2Error> {
        require_connection(header, "PING")?;
        let data: [u8; 8] = payload.as_ref().try_into().map_err(|_| malformed("PING"))?;
        Ok(Self {
            ack: header.has_flag(flags::ACK),
            data,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: 8,
            frame_type: frame_type::PING,
            flags: if self.ack { flags::ACK } else { 0 },
            stream_id: 0,
        }
        .write(dst);
        dst.put_slice(&self.data);
    }
}

/// GOAWAY frame (type 0x7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoAwayFrame {
    pub last_stream_id: u32,
    pub error_code: ErrorCode,
    pub debug_data: Bytes,
}

impl GoAwayFrame {
    pub fn new(last_stream_id: u32, error_code: ErrorCode) -> Self {
        Self {
            last_stream_id,
            error_code,
            debug_data: Bytes::new(),
        }
    }

    pub fn parse(header: &FrameHeader, mut payload: Bytes) -> Result<Self, H2Error> {
        require_connection(header, "GOAWAY")?;
        if payload.len() < 8 {
            return Err(malformed("GOAWAY"));
        }
        let last_stream_id = payload.get_u32() & MAX_STREAM_ID;
        let error_code = ErrorCode::from_u32(payload.get_u32());
        Ok(Self {
            last_stream_id,
            error_code,
            debug_data: payload,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: 8 + self.debug_data.len() as u32,
            frame_type: frame_type::GOAWAY,
            flags: 0,
            stream_id: 0,
        }
        .write(dst);
        dst.put_u32(self.last_stream_id & MAX_STREAM_ID);
        dst.put_u32(self.error_code.into());
        dst.put_slice(&self.debug_data);
    }
}

/// WINDOW_UPDATE frame (type 0x8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    /// 0 for the connection window.
    pub stream_id: u32,
    pub increment: u32,
}

impl WindowUpdateFrame {
    pub fn new(stream_id: u32, increment: u32) -> Self {
        Self { stream_id, increment }
    }

    pub fn parse(header: &FrameHeader, mut payload: Bytes) -> Result<Self, H2Error> {
        if payload.len() != 4 {
            return Err(malformed("WINDOW_UPDATE"));
        }
        let increment = payload.get_u32() & MAX_STREAM_ID;
        if increment == 0 {
            return Err(if header.stream_id == 0 {
                H2Error::connection(ErrorKind::InvalidWindowIncrement)
            } else {
                H2Error::stream(header.stream_id, ErrorKind::InvalidWindowIncrement)
            });
        }
        Ok(Self {
            stream_id: header.stream_id,
            increment,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: 4,
            frame_type: frame_type::WINDOW_UPDATE,
            flags: 0,
            stream_id: self.stream_id,
        }
        .write(dst);
        dst.put_u32(self.increment & MAX_STREAM_ID);
    }
}

/// CONTINUATION frame (type 0x9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationFrame {
    pub stream_id: u32,
    pub header_block: Bytes,
    pub end_headers: bool,
}

impl ContinuationFrame {
    pub fn parse(header: &FrameHeader, payload: Bytes) -> Result<Self, H2Error> {
        require_stream(header, "CONTINUATION")?;
        Ok(Self {
            stream_id: header.stream_id,
            header_block: payload,
            end_headers: header.is_end_headers(),
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        FrameHeader {
            length: self.header_block.len() as u32,
            frame_type: frame_type::CONTINUATION,
            flags: if self.end_headers { flags::END_HEADERS } else { 0 },
            stream_id: self.stream_id,
        }
        .write(dst);
        dst.put_slice(&self.header_block);
    }
}

// ============================================================================
// Tests
// ============================================================================
