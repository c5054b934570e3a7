use tracing::trace;

use super::primitives::{encode_integer, encode_string};
use super::table::{entry_size, DynamicTable, TableMatch, DEFAULT_TABLE_SIZE};
use super::H2Header;
use crate::error::HpackError;

/// HPACK encoder for one direction of a connection.
#[derive(Debug)]
pub struct HpackEncoder {
    table: DynamicTable,
    /// Local cap on the table size, independent of what the peer allows.
    size_limit: usize,
    /// Smallest and final size since the last emitted block.
    pending_size_update: Option<(usize, usize)>,
    use_huffman: bool,
}

impl Default for HpackEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HpackEncoder {
    pub fn new() -> Self {
        Self {
            table: DynamicTable::new(DEFAULT_TABLE_SIZE),
            size_limit: DEFAULT_TABLE_SIZE,
            pending_size_update: None,
            use_huffman: true,
        }
    }

    pub fn set_use_huffman(&mut self, enabled: bool) {
        self.use_huffman = enabled;
    }

    /// Cap the table below whatever the peer advertises.
    pub fn set_size_limit(&mut self, limit: usize) {
        self.size_limit = limit;
        self.apply_peer_table_size(self.table.permitted_size());
    }

    pub fn table(&self) -> &DynamicTable {
        &self.table
    }

    /// React to the peer's SETTINGS_HEADER_TABLE_SIZE.
    pub fn apply_peer_table_size(&mut self, peer_max: usize) {
        let previous = self.table.max_size();
        self.table.set_permitted_size(peer_max);
        let target = peer_max.min(self.size_limit);
        if target != previous {
            self.resize(target);
        }
    }

    /// Resize the table; a size update is emitted at the start of the next block.
    pub fn set_max_table_size(&mut self, max_size: usize) -> Result<(), HpackError> {
        if max_size > self.table.permitted_size() {
            return Err(HpackError::InvalidTableSizeUpdate {
                requested: max_size,
                permitted: self.table.permitted_size(),
            });
        }
        if max_size != self.table.max_size() {
            self.resize(max_size);
        }
        Ok(())
    }

    fn resize(&mut self, max_size: usize) {
        if self.table.set_max_size(max_size).is_err() {
            return;
        }
        self.pending_size_update = Some(match self.pending_size_update {
            Some((lowest, _)) => (lowest.min(max_size), max_size),
            None => (max_size, max_size),
        });
    }

    /// Encode a header list into a single header block.
    pub fn encode(&mut self, headers: &[H2Header]) -> Vec<u8> {
        let mut dst = Vec::with_capacity(headers.iter().map(|h| h.name.len() + h.value.len()).sum());

        if let Some((lowest, last)) = self.pending_size_update.take() {
            trace!(lowest, last, "hpack emitting table size update");
            if lowest < last {
                encode_integer(lowest, 5, 0x20, &mut dst);
            }
            encode_integer(last, 5, 0x20, &mut dst);
        }

        for header in headers {
            self.encode_field(header, &mut dst);
        }
        dst
    }

    fn encode_field(&mut self, header: &H2Header, dst: &mut Vec<u8>) {
        let found = self.table.find(&header.name, &header.value);

        if header.sensitive {
            let name_index = match found {
                TableMatch::Full(i) | TableMatch::Name(i) => i,
                TableMatch::None => 0,
            };
            self.encode_literal(header, name_index, 4, 0x10, dst);
            return;
        }

        let name_index = match found {
            TableMatch::Full(index) => {
                encode_integer(index, 7, 0x80, dst);
                return;
            }
            TableMatch::Name(i) => i,
            TableMatch::None => 0,
        };

        if entry_size(&header.name, &header.value) > self.table.max_size() {
            // Would only flush the table; send without indexing instead.
            self.encode_literal(header, name_index, 4, 0x00, dst);
        } else {
            self.encode_literal(header, name_index, 6, 0x40, dst);
            self.table.insert(header.name.clone(), header.value.clone());
        }
    }

    fn encode_literal(&self, header: &H2Header, name_index: usize, prefix_bits: u8, flags: u8, dst: &mut Vec<u8>) {
        encode_integer(name_index, prefix_bits, flags, dst);
        if name_index == 0 {
            encode_string(&header.name, self.use_huffman, dst);
        }
        encode_string(&header.value, self.use_huffman, dst);
    }
}
