use bytes::Bytes;
use tracing::trace;

use super::primitives::{decode_integer, decode_string};
use super::table::{DynamicTable, DEFAULT_TABLE_SIZE};
use super::H2Header;
use crate::error::HpackError;

/// HPACK decoder for one direction of a connection.
#[derive(Debug)]
pub struct HpackDecoder {
    table: DynamicTable,
    max_header_list_size: Option<usize>,
}

impl Default for HpackDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HpackDecoder {
    pub fn new() -> Self {
        Self::with_max_table_size(DEFAULT_TABLE_SIZE)
    }

    pub fn with_max_table_size(max_size: usize) -> Self {
        Self {
            table: DynamicTable::new(max_size),
            max_header_list_size: None,
        }
    }

    /// Bound size updates by the SETTINGS_HEADER_TABLE_SIZE we advertised.
    pub fn set_max_allowed_table_size(&mut self, max_size: usize) {
        self.table.set_permitted_size(max_size);
    }

    /// Limit on the decoded list, counted as name + value + 32 per field.
    pub fn set_max_header_list_size(&mut self, max: Option<usize>) {
        self.max_header_list_size = max;
    }

    pub fn table(&self) -> &DynamicTable {
        &self.table
    }

    /// Decode one complete header block, preserving field order.
    pub fn decode(&mut self, block: &[u8]) -> Result<Vec<H2Header>, HpackError> {
        let mut src = block;
        let mut headers = Vec::new();
        let mut list_size = 0usize;
        let mut size_update_allowed = true;

        while let Some(&first) = src.first() {
            let header = if first & 0x80 != 0 {
                // Indexed header field
                let index = decode_integer(&mut src, 7)?;
                let (name, value) = self.table.lookup(index)?;
                H2Header { name, value, sensitive: false }
            } else if first & 0xc0 == 0x40 {
                // Literal with incremental indexing
                let (name, value) = self.decode_literal(&mut src, 6)?;
                self.table.insert(name.clone(), value.clone());
                H2Header { name, value, sensitive: false }
            } else if first & 0xe0 == 0x20 {
                if !size_update_allowed {
                    return Err(HpackError::InvalidTableSizeUpdate {
                        requested: decode_integer(&mut src, 5)?,
                        permitted: self.table.permitted_size(),
                    });
                }
                let size = decode_integer(&mut src, 5)?;
                trace!(size, "hpack dynamic table size update");
                self.table.set_max_size(size)?;
                continue;
            } else {
                // Literal without indexing (0000) or never indexed (0001)
                let sensitive = first & 0x10 != 0;
                let (name, value) = self.decode_literal(&mut src, 4)?;
                H2Header { name, value, sensitive }
            };
            size_update_allowed = false;

            list_size += header.size();
            if let Some(max) = self.max_header_list_size {
                if list_size > max {
                    return Err(HpackError::HeaderListTooLarge { max });
                }
            }
            headers.push(header);
        }

        Ok(headers)
    }

    fn decode_literal(&self, src: &mut &[u8], prefix_bits: u8) -> Result<(Bytes, Bytes), HpackError> {
        let index = decode_integer(src, prefix_bits)?;
        let name = if index == 0 {
            decode_string(src)?
        } else {
            self.table.lookup(index)?.0
        };
        let value = decode_string(src)?;
        Ok((name, value))
    }
}
