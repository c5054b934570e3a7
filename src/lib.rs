//! h2-engine: a sans-I/O HTTP/2 protocol engine
//!
//! This crate implements the protocol core of HTTP/2 (RFC 7540) with HPACK
//! header compression (RFC 7541) as a pure state machine. It never reads or
//! writes a socket: the caller feeds received bytes in, drains bytes to
//! send, and consumes structured events.
//!
//! # Features
//!
//! - **Sans-I/O Design**: No async runtime, no timers, no transport
//! - **HPACK**: Own encoder/decoder with dynamic table, Huffman coding and
//!   never-indexed (sensitive) fields
//! - **Framing**: All ten RFC 7540 frame types, padding, size limits
//! - **CONTINUATION Assembly**: Header blocks are reassembled before decoding
//! - **Streams**: Full RFC 7540 §5.1 state machine, server push, GOAWAY
//! - **Flow Control**: Stream and connection windows, automatic or manual
//!   WINDOW_UPDATE
//! - **Structured Errors**: Stream errors reset one stream, connection errors
//!   end the connection with GOAWAY, local misuse never writes anything
//!
//! # Quick Start
//!
//! ```rust
//! use h2_engine::{Connection, Event, H2Header};
//!
//! let mut client = Connection::client();
//! let mut server = Connection::server();
//!
//! let headers = [
//!     H2Header::new(":method", "GET"),
//!     H2Header::new(":scheme", "https"),
//!     H2Header::new(":path", "/"),
//!     H2Header::new(":authority", "example.com"),
//! ];
//! let stream_id = client.open_stream(&headers, true).unwrap();
//!
//! // Move bytes between the two ends (normally through a socket).
//! while let Some(bytes) = client.poll_output() {
//!     server.recv(&bytes).unwrap();
//! }
//!
//! while let Some(event) = server.poll_event() {
//!     if let Event::Headers { stream_id: id, headers, .. } = event {
//!         assert_eq!(id, stream_id);
//!         assert_eq!(headers[0].value, "GET");
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! Layers, bottom up:
//! - [`hpack`]: header compression contexts
//! - [`frame`]: typed frames and their wire encoding
//! - [`h2_codec`]: byte buffer to frames, preface and CONTINUATION handling
//! - [`stream`], [`flow_control`], [`settings`]: per-stream and per-connection state
//! - [`connection`]: the engine tying them together
//!
//! It does NOT provide:
//! - TCP transport or TLS/ALPN (you provide the bytes)
//! - HTTP semantics beyond header-name case (pseudo-header rules, etc.)
//! - Priority-based scheduling (priority data is recorded only)

pub mod config;
pub mod connection;
pub mod error;
pub mod flow_control;
pub mod frame;
pub mod h2_codec;
pub mod hpack;
pub mod settings;
pub mod stream;

pub use config::{ConnectionConfig, Role};
pub use connection::{Connection, ConnectionState, Event};
pub use error::{ErrorCode, ErrorKind, H2Error, HpackError};
pub use frame::{flags, frame_type, settings_id, Frame, FrameHeader};
pub use h2_codec::{is_h2c_preface, H2Codec, CONNECTION_PREFACE, MAX_HEADER_BLOCK_SIZE};
pub use hpack::{H2Header, HpackDecoder, HpackEncoder};
pub use settings::Settings;
pub use stream::StreamState;
