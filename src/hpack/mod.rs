//! HPACK: Header Compression for HTTP/2 (RFC 7541)
//!
//! One [`HpackEncoder`] and one [`HpackDecoder`] exist per connection, each
//! owning the dynamic table for its direction. Both tables must see exactly
//! the same sequence of header blocks as the peer's counterparts, so a
//! decoding failure is never recoverable.

mod decoder;
mod encoder;
pub mod huffman;
pub mod primitives;
pub mod table;

use bytes::Bytes;

pub use decoder::HpackDecoder;
pub use encoder::HpackEncoder;
pub use table::{DynamicTable, TableMatch, DEFAULT_TABLE_SIZE, STATIC_TABLE};

/// A single HTTP/2 header field.
///
/// `sensitive` fields are always sent as literal-never-indexed and the flag
/// is set again on the receiving side, so it survives re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H2Header {
    pub name: Bytes,
    pub value: Bytes,
    pub sensitive: bool,
}

impl H2Header {
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sensitive: false,
        }
    }

    /// A field that must never enter a dynamic table (credentials, cookies).
    pub fn sensitive(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            sensitive: true,
            ..Self::new(name, value)
        }
    }

    /// Size counted against SETTINGS_MAX_HEADER_LIST_SIZE.
    pub fn size(&self) -> usize {
        table::entry_size(&self.name, &self.value)
    }

    /// True when the name has no upper-case ASCII and is non-empty.
    pub fn has_valid_name(&self) -> bool {
        !self.name.is_empty() && !self.name.iter().any(u8::is_ascii_uppercase)
    }
}
