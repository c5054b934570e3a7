//! HPACK static and dynamic tables (RFC 7541 Section 2.3).

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::HpackError;

/// Per-entry overhead counted against the table size (RFC 7541 §4.1).
pub const ENTRY_OVERHEAD: usize = 32;

/// Default SETTINGS_HEADER_TABLE_SIZE.
pub const DEFAULT_TABLE_SIZE: usize = 4096;

/// Static table entries as defined in RFC 7541 Appendix A.
pub static STATIC_TABLE: &[(&str, &str)] = &[
    (":authority", ""),                   // 1
    (":method", "GET"),                   // 2
    (":method", "POST"),                  // 3
    (":path", "/"),                       // 4
    (":path", "/index.html"),             // 5
    (":scheme", "http"),                  // 6
    (":scheme", "https"),                 // 7
    (":status", "200"),                   // 8
    (":status", "204"),                   // 9
    (":status", "206"),                   // 10
    (":status", "304"),                   // 11
    (":status", "400"),                   // 12
    (":status", "404"),                   // 13
    (":status", "500"),                   // 14
    ("accept-charset", ""),               // 15
    ("accept-encoding", "gzip, deflate"), // 16
    ("accept-language", ""),              // 17
    ("accept-ranges", ""),                // 18
    ("accept", ""),                       // 19
    ("access-control-allow-origin", ""),  // 20
    ("age", ""),                          // 21
    ("allow", ""),                        // 22
    ("authorization", ""),                // 23
    ("cache-control", ""),                // 24
    ("content-disposition", ""),          // 25
    ("content-encoding", ""),             // 26
    ("content-language", ""),             // 27
    ("content-length", ""),               // 28
    ("content-location", ""),             // 29
    ("content-range", ""),                // 30
    ("content-type", ""),                 // 31
    ("cookie", ""),                       // 32
    ("date", ""),                         // 33
    ("etag", ""),                         // 34
    ("expect", ""),                       // 35
    ("expires", ""),                      // 36
    ("from", ""),                         // 37
    ("host", ""),                         // 38
    ("if-match", ""),                     // 39
    ("if-modified-since", ""),            // 40
    ("if-none-match", ""),                // 41
    ("if-range", ""),                     // 42
    ("if-unmodified-since", ""),          // 43
    ("last-modified", ""),                // 44
    ("link", ""),                         // 45
    ("location", ""),                     // 46
    ("max-forwards", ""),                 // 47
    ("proxy-authenticate", ""),           // 48
    ("proxy-authorization", ""),          // 49
    ("range", ""),                        // 50
    ("referer", ""),                      // 51
    ("refresh", ""),                      // 52
    ("retry-after", ""),                  // 53
    ("server", ""),                       // 54
    ("set-cookie", ""),                   // 55
    ("strict-transport-security", ""),    // 56
    ("transfer-encoding", ""),            // 57
    ("user-agent", ""),                   // 58
    ("vary", ""),                         // 59
    ("via", ""),                          // 60
    ("www-authenticate", ""),             // 61
];

pub const STATIC_TABLE_LEN: usize = 61;

/// Result of searching the tables for a header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMatch {
    /// Name and value both match the entry at this index.
    Full(usize),
    /// Only the name matches.
    Name(usize),
    None,
}

/// The dynamic table of one compression direction.
///
/// Newest entries live at the front. Index 62 always refers to the most
/// recently inserted entry.
#[derive(Debug, Clone)]
pub struct DynamicTable {
    entries: VecDeque<(Bytes, Bytes)>,
    size: usize,
    max_size: usize,
    /// Upper bound on `max_size`, from the governing SETTINGS value.
    permitted_size: usize,
}

impl Default for DynamicTable {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_SIZE)
    }
}

impl DynamicTable {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            size: 0,
            max_size,
            permitted_size: max_size,
        }
    }

    /// Current total of entry sizes in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn permitted_size(&self) -> usize {
        self.permitted_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Change the bound that `set_max_size` may not exceed.
    ///
    /// Shrinking the bound below the current size also shrinks the table.
    pub fn set_permitted_size(&mut self, permitted: usize) {
        self.permitted_size = permitted;
        if self.max_size > permitted {
            self.max_size = permitted;
            self.evict_to(permitted);
        }
    }

    /// Resize the table, evicting the oldest entries until it fits.
    pub fn set_max_size(&mut self, max_size: usize) -> Result<(), HpackError> {
        if max_size > self.permitted_size {
            return Err(HpackError::InvalidTableSizeUpdate {
                requested: max_size,
                permitted: self.permitted_size,
            });
        }
        self.max_size = max_size;
        self.evict_to(max_size);
        Ok(())
    }

    /// Add an entry at the front.
    ///
    /// An entry larger than the whole table empties the table and is not stored.
    pub fn insert(&mut self, name: Bytes, value: Bytes) {
        let entry_size = entry_size(&name, &value);
        if entry_size > self.max_size {
            self.entries.clear();
            self.size = 0;
            return;
        }
        self.evict_to(self.max_size - entry_size);
        self.size += entry_size;
        self.entries.push_front((name, value));
    }

    /// Fetch by HPACK index across both tables (1..=61 static, 62.. dynamic).
    pub fn lookup(&self, index: usize) -> Result<(Bytes, Bytes), HpackError> {
        match index {
            0 => Err(HpackError::HeaderIndexOutOfRange(index)),
            1..=STATIC_TABLE_LEN => {
                let (name, value) = STATIC_TABLE[index - 1];
                Ok((Bytes::from_static(name.as_bytes()), Bytes::from_static(value.as_bytes())))
            }
            _ => self
                .entries
                .get(index - STATIC_TABLE_LEN - 1)
                .cloned()
                .ok_or(HpackError::HeaderIndexOutOfRange(index)),
        }
    }

    /// Search for the lowest index that matches, preferring full matches.
    pub fn find(&self, name: &[u8], value: &[u8]) -> TableMatch {
        let mut name_match = None;
        for (i, (n, v)) in STATIC_TABLE.iter().enumerate() {
            if n.as_bytes() == name {
                if v.as_bytes() == value {
                    return TableMatch::Full(i + 1);
                }
                name_match.get_or_insert(i + 1);
            }
        }
        for (i, (n, v)) in self.entries.iter().enumerate() {
            if n.as_ref() == name {
                let index = i + STATIC_TABLE_LEN + 1;
                if v.as_ref() == value {
                    return TableMatch::Full(index);
                }
                name_match.get_or_insert(index);
            }
        }
        name_match.map_or(TableMatch::None, TableMatch::Name)
    }

    fn evict_to(&mut self, target: usize) {
        while self.size > target {
            match self.entries.pop_back() {
                Some((name, value)) => self.size -= entry_size(&name, &value),
                None => break,
            }
        }
    }
}

/// Size of an entry as counted against the table (RFC 7541 §4.1).
pub fn entry_size(name: &[u8], value: &[u8]) -> usize {
    name.len() + value.len() + ENTRY_OVERHEAD
}
