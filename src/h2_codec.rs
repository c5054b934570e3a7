//! Sans-I/O HTTP/2 frame reader.
//!
//! [`H2Codec`] buffers raw transport bytes and yields complete [`Frame`]s:
//! 1. Validates the client connection preface (server side)
//! 2. Enforces the local SETTINGS_MAX_FRAME_SIZE
//! 3. Folds HEADERS/PUSH_PROMISE + CONTINUATION into one header block
//! 4. Skips frame types it does not know
//!
//! Reference: RFC 7540 Sections 3.5, 4.2, 6.10

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use crate::error::{ErrorKind, H2Error};
use crate::frame::{
    frame_type, Frame, FrameHeader, HeadersFrame, PushPromiseFrame, DEFAULT_MAX_FRAME_SIZE,
};

/// Default cap on an assembled header block (256 KB).
/// Bounds memory against CONTINUATION floods.
pub const MAX_HEADER_BLOCK_SIZE: usize = 256 * 1024;

/// The HTTP/2 connection preface (24 bytes)
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Check if data starts with HTTP/2 connection preface (h2c detection)
pub fn is_h2c_preface(data: &[u8]) -> bool {
    data.starts_with(CONNECTION_PREFACE)
}

/// The single header block that may be open on a connection.
#[derive(Debug)]
enum PendingHeaderBlock {
    Headers(HeadersFrame, BytesMut),
    PushPromise(PushPromiseFrame, BytesMut),
}

impl PendingHeaderBlock {
    fn stream_id(&self) -> u32 {
        match self {
            Self::Headers(frame, _) => frame.stream_id,
            Self::PushPromise(frame, _) => frame.stream_id,
        }
    }

    fn fragments(&mut self) -> &mut BytesMut {
        match self {
            Self::Headers(_, buf) | Self::PushPromise(_, buf) => buf,
        }
    }

    fn finish(self) -> Frame {
        match self {
            Self::Headers(mut frame, buf) => {
                frame.header_block = buf.freeze();
                frame.end_headers = true;
                Frame::Headers(frame)
            }
            Self::PushPromise(mut frame, buf) => {
                frame.header_block = buf.freeze();
                frame.end_headers = true;
                Frame::PushPromise(frame)
            }
        }
    }
}

/// Incremental HTTP/2 frame decoder.
#[derive(Debug)]
pub struct H2Codec {
    /// Buffer for incomplete frames
    buffer: BytesMut,
    /// Still waiting for (part of) the client preface
    expect_preface: bool,
    /// Our advertised SETTINGS_MAX_FRAME_SIZE
    max_frame_size: u32,
    max_header_block_size: usize,
    pending: Option<PendingHeaderBlock>,
}

impl Default for H2Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl H2Codec {
    /// A codec that reads frames immediately (client side).
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            expect_preface: false,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_block_size: MAX_HEADER_BLOCK_SIZE,
            pending: None,
        }
    }

    /// A codec that first requires the client connection preface.
    pub fn server() -> Self {
        Self {
            expect_preface: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_max_header_block_size(mut self, max: usize) -> Self {
        self.max_header_block_size = max;
        self
    }

    pub fn set_max_frame_size(&mut self, max: u32) {
        self.max_frame_size = max;
    }

    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    /// Stream whose header block is waiting for CONTINUATION, if any.
    pub fn open_header_block(&self) -> Option<u32> {
        self.pending.as_ref().map(PendingHeaderBlock::stream_id)
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Append transport bytes; no parsing happens until [`next_frame`](Self::next_frame).
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Feed `data` and drain every complete frame.
    pub fn process(&mut self, data: &[u8]) -> Result<Vec<Frame>, H2Error> {
        self.feed(data);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Next complete frame, or `None` until more bytes arrive.
    ///
    /// A returned stream error consumed its frame; the codec stays usable.
    /// After a connection error the codec must not be used again.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, H2Error> {
        if self.expect_preface && !self.consume_preface()? {
            return Ok(None);
        }

        loop {
            let header = match FrameHeader::parse(&self.buffer) {
                Ok(header) => header,
                Err(_) => return Ok(None),
            };
            if header.length > self.max_frame_size {
                return Err(H2Error::connection(ErrorKind::FrameSize {
                    length: header.length as usize,
                    max: self.max_frame_size,
                }));
            }
            if self.buffer.len() < header.total_size() {
                return Ok(None);
            }

            let mut payload = self.buffer.split_to(header.total_size()).freeze();
            payload.advance(crate::frame::FRAME_HEADER_SIZE);
            trace!(
                frame = frame_type::name(header.frame_type),
                stream_id = header.stream_id,
                length = header.length,
                flags = header.flags,
                "frame received"
            );

            self.check_header_block_sequence(&header)?;
            if !frame_type::is_known(header.frame_type) {
                trace!(frame_type = header.frame_type, "ignoring unknown frame type");
                continue;
            }

            if let Some(frame) = self.assemble(Frame::parse(&header, payload)?)? {
                return Ok(Some(frame));
            }
        }
    }

    /// Discard all buffered state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending = None;
    }

    fn consume_preface(&mut self) -> Result<bool, H2Error> {
        let available = self.buffer.len().min(CONNECTION_PREFACE.len());
        if self.buffer[..available] != CONNECTION_PREFACE[..available] {
            return Err(H2Error::connection(ErrorKind::InvalidPreface));
        }
        if available < CONNECTION_PREFACE.len() {
            return Ok(false);
        }
        self.buffer.advance(CONNECTION_PREFACE.len());
        self.expect_preface = false;
        Ok(true)
    }

    fn check_header_block_sequence(&self, header: &FrameHeader) -> Result<(), H2Error> {
        match self.open_header_block() {
            Some(open_stream)
                if header.frame_type != frame_type::CONTINUATION || header.stream_id != open_stream =>
            {
                Err(H2Error::connection(ErrorKind::UnexpectedFrameDuringHeaderBlock {
                    frame_type: header.frame_type,
                    stream_id: header.stream_id,
                    open_stream,
                }))
            }
            None if header.frame_type == frame_type::CONTINUATION => Err(H2Error::protocol(format!(
                "CONTINUATION on stream {} without open header block",
                header.stream_id
            ))),
            _ => Ok(()),
        }
    }

    fn assemble(&mut self, frame: Frame) -> Result<Option<Frame>, H2Error> {
        match frame {
            Frame::Headers(headers) if !headers.end_headers => {
                self.check_block_size(headers.header_block.len())?;
                let fragments = BytesMut::from(&headers.header_block[..]);
                self.pending = Some(PendingHeaderBlock::Headers(headers, fragments));
                Ok(None)
            }
            Frame::PushPromise(promise) if !promise.end_headers => {
                self.check_block_size(promise.header_block.len())?;
                let fragments = BytesMut::from(&promise.header_block[..]);
                self.pending = Some(PendingHeaderBlock::PushPromise(promise, fragments));
                Ok(None)
            }
            Frame::Continuation(continuation) => {
                let Some(mut pending) = self.pending.take() else {
                    return Err(H2Error::protocol("CONTINUATION without open header block"));
                };
                let size = pending.fragments().len() + continuation.header_block.len();
                self.check_block_size(size)?;
                pending.fragments().extend_from_slice(&continuation.header_block);
                if continuation.end_headers {
                    Ok(Some(pending.finish()))
                } else {
                    self.pending = Some(pending);
                    Ok(None)
                }
            }
            other => Ok(Some(other)),
        }
    }

    fn check_block_size(&mut self, size: usize) -> Result<(), H2Error> {
        if size > self.max_header_block_size {
            self.pending = None;
            return Err(H2Error::connection(ErrorKind::HeaderBlockTooLarge {
                size,
                max: self.max_header_block_size,
            }));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
