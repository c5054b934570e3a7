//! Error types for the HTTP/2 engine.
//!
//! Failures are split the way RFC 7540 §5.4 splits them: stream errors reset
//! a single stream, connection errors end the connection with GOAWAY. Errors
//! raised by local API misuse (for example sending more DATA than the peer
//! has granted) are reported as [`H2Error::Local`] and put nothing on the wire.

use std::fmt;

/// HTTP/2 error codes (RFC 7540 Section 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

impl ErrorCode {
    /// Map a wire value to an error code.
    ///
    /// Unknown codes are treated as `INTERNAL_ERROR` (RFC 7540 §7).
    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0 => Self::NoError,
            0x1 => Self::ProtocolError,
            0x2 => Self::InternalError,
            0x3 => Self::FlowControlError,
            0x4 => Self::SettingsTimeout,
            0x5 => Self::StreamClosed,
            0x6 => Self::FrameSizeError,
            0x7 => Self::RefusedStream,
            0x8 => Self::Cancel,
            0x9 => Self::CompressionError,
            0xa => Self::ConnectError,
            0xb => Self::EnhanceYourCalm,
            0xc => Self::InadequateSecurity,
            0xd => Self::Http11Required,
            _ => Self::InternalError,
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> u32 {
        code as u32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "NO_ERROR",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::FlowControlError => "FLOW_CONTROL_ERROR",
            Self::SettingsTimeout => "SETTINGS_TIMEOUT",
            Self::StreamClosed => "STREAM_CLOSED",
            Self::FrameSizeError => "FRAME_SIZE_ERROR",
            Self::RefusedStream => "REFUSED_STREAM",
            Self::Cancel => "CANCEL",
            Self::CompressionError => "COMPRESSION_ERROR",
            Self::ConnectError => "CONNECT_ERROR",
            Self::EnhanceYourCalm => "ENHANCE_YOUR_CALM",
            Self::InadequateSecurity => "INADEQUATE_SECURITY",
            Self::Http11Required => "HTTP_1_1_REQUIRED",
        };
        f.write_str(name)
    }
}

/// HPACK decoding and table failures (RFC 7541).
///
/// Any of these raised while decoding a peer's header block leaves the
/// decoder's dynamic table in an unknown state, so the connection treats
/// them all as fatal `COMPRESSION_ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HpackError {
    #[error("header index {0} out of range")]
    HeaderIndexOutOfRange(usize),
    #[error("invalid dynamic table size update to {requested} (permitted {permitted})")]
    InvalidTableSizeUpdate { requested: usize, permitted: usize },
    #[error("integer overflow in prefix-coded integer")]
    IntegerOverflow,
    #[error("prefix-coded integer truncated")]
    MalformedInteger,
    #[error("string literal truncated")]
    TruncatedString,
    #[error("invalid huffman code or padding")]
    HuffmanDecodingError,
    #[error("header list size exceeds limit of {max} bytes")]
    HeaderListTooLarge { max: usize },
}

/// What went wrong, independent of how the failure is scoped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Fewer than 9 bytes buffered. Not fatal: wait for more input.
    #[error("truncated frame header ({available} bytes available)")]
    FrameHeaderParse { available: usize },
    #[error("frame of {length} bytes exceeds maximum of {max}")]
    FrameSize { length: usize, max: u32 },
    #[error("malformed {frame} frame payload")]
    MalformedFrame { frame: &'static str },
    #[error("WINDOW_UPDATE increment of zero")]
    InvalidWindowIncrement,
    #[error("frame type {frame_type:#x} on stream {stream_id} while header block open on stream {open_stream}")]
    UnexpectedFrameDuringHeaderBlock {
        frame_type: u8,
        stream_id: u32,
        open_stream: u32,
    },
    #[error("header block of {size} bytes exceeds limit of {max}")]
    HeaderBlockTooLarge { size: usize, max: usize },
    #[error("flow-control window would exceed 2^31-1")]
    WindowOverflow,
    #[error("flow-control window exhausted ({requested} requested, {available} available)")]
    FlowControl { requested: usize, available: i64 },
    #[error("hpack: {0}")]
    Hpack(#[from] HpackError),
    #[error("stream {0} is closed")]
    StreamClosed(u32),
    #[error("stream refused")]
    RefusedStream,
    #[error("stream {stream_id} is beyond GOAWAY last stream id {last_stream_id}")]
    GoingAway { stream_id: u32, last_stream_id: u32 },
    #[error("invalid setting: {0}")]
    InvalidSetting(&'static str),
    #[error("invalid connection preface")]
    InvalidPreface,
    #[error("invalid header field name {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid stream id {0}")]
    InvalidStreamId(u32),
    #[error("unacknowledged SETTINGS timed out")]
    SettingsTimeout,
    #[error("connection is closed")]
    ConnectionClosed,
    #[error("stream reset with {0}")]
    Reset(ErrorCode),
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl ErrorKind {
    /// The RFC 7540 error code that best describes this failure on the wire.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::FrameHeaderParse { .. } | Self::ConnectionClosed => ErrorCode::InternalError,
            Self::FrameSize { .. } | Self::HeaderBlockTooLarge { .. } => ErrorCode::FrameSizeError,
            Self::MalformedFrame { .. } => ErrorCode::FrameSizeError,
            Self::WindowOverflow | Self::FlowControl { .. } => ErrorCode::FlowControlError,
            Self::Hpack(_) => ErrorCode::CompressionError,
            Self::StreamClosed(_) => ErrorCode::StreamClosed,
            Self::RefusedStream | Self::GoingAway { .. } => ErrorCode::RefusedStream,
            Self::InvalidSetting(_) => ErrorCode::ProtocolError,
            Self::SettingsTimeout => ErrorCode::SettingsTimeout,
            Self::Reset(code) => *code,
            Self::InvalidWindowIncrement
            | Self::UnexpectedFrameDuringHeaderBlock { .. }
            | Self::InvalidPreface
            | Self::InvalidHeaderName(_)
            | Self::InvalidStreamId(_)
            | Self::Protocol(_) => ErrorCode::ProtocolError,
        }
    }
}

/// A structured, caller-visible HTTP/2 failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum H2Error {
    /// Fatal: the connection is torn down with GOAWAY(code).
    #[error("connection error {code}: {kind}")]
    Connection { code: ErrorCode, kind: ErrorKind },
    /// Scoped to one stream, which is reset with RST_STREAM(code).
    #[error("stream {stream_id} error {code}: {kind}")]
    Stream {
        stream_id: u32,
        code: ErrorCode,
        kind: ErrorKind,
    },
    /// A local request that cannot be carried out now. Nothing was sent.
    #[error("{0}")]
    Local(ErrorKind),
}

impl H2Error {
    #[must_use]
    pub fn connection(kind: impl Into<ErrorKind>) -> Self {
        let kind = kind.into();
        Self::Connection {
            code: kind.code(),
            kind,
        }
    }

    #[must_use]
    pub fn connection_with(code: ErrorCode, kind: impl Into<ErrorKind>) -> Self {
        Self::Connection {
            code,
            kind: kind.into(),
        }
    }

    #[must_use]
    pub fn stream(stream_id: u32, kind: impl Into<ErrorKind>) -> Self {
        let kind = kind.into();
        Self::Stream {
            stream_id,
            code: kind.code(),
            kind,
        }
    }

    #[must_use]
    pub fn stream_with(stream_id: u32, code: ErrorCode, kind: impl Into<ErrorKind>) -> Self {
        Self::Stream {
            stream_id,
            code,
            kind: kind.into(),
        }
    }

    #[must_use]
    pub fn local(kind: impl Into<ErrorKind>) -> Self {
        Self::Local(kind.into())
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::connection(ErrorKind::Protocol(message.into()))
    }

    /// Error code that is (or would be) sent to the peer.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Connection { code, .. } | Self::Stream { code, .. } => *code,
            Self::Local(kind) => kind.code(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        match self {
            Self::Connection { kind, .. } | Self::Stream { kind, .. } | Self::Local(kind) => kind,
        }
    }

    /// The offending stream, for stream-scoped errors.
    #[must_use]
    pub fn stream_id(&self) -> Option<u32> {
        match self {
            Self::Stream { stream_id, .. } => Some(*stream_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

impl From<HpackError> for H2Error {
    fn from(err: HpackError) -> Self {
        Self::connection(ErrorKind::Hpack(err))
    }
}

pub type Result<T, E = H2Error> = std::result::Result<T, E>;
