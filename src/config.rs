//! Connection configuration.

use crate::h2_codec::MAX_HEADER_BLOCK_SIZE;
use crate::hpack::DEFAULT_TABLE_SIZE;
use crate::settings::{Settings, DEFAULT_INITIAL_WINDOW_SIZE};

/// Which end of the connection this engine plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Everything a [`Connection`](crate::Connection) needs besides bytes.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub role: Role,
    /// Advertised in our first SETTINGS frame.
    pub settings: Settings,
    /// Cap on an assembled HEADERS/PUSH_PROMISE + CONTINUATION block.
    pub max_header_block_size: usize,
    /// Target for the connection-level receive window.
    pub initial_connection_window_size: u32,
    /// Replenish receive windows without waiting for `release_capacity`.
    pub auto_window_update: bool,
    pub use_huffman: bool,
    /// Upper bound on the encoder's dynamic table, below the peer's limit.
    pub max_encoder_table_size: usize,
    /// Closed stream ids remembered for late frames.
    pub closed_stream_grace: usize,
}

impl ConnectionConfig {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            settings: Settings::default(),
            max_header_block_size: MAX_HEADER_BLOCK_SIZE,
            initial_connection_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            auto_window_update: true,
            use_huffman: true,
            max_encoder_table_size: DEFAULT_TABLE_SIZE,
            closed_stream_grace: 64,
        }
    }

    pub fn client() -> Self {
        Self::new(Role::Client)
    }

    pub fn server() -> Self {
        Self::new(Role::Server)
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn max_header_block_size(mut self, max: usize) -> Self {
        self.max_header_block_size = max;
        self
    }

    #[must_use]
    pub fn initial_connection_window_size(mut self, size: u32) -> Self {
        self.initial_connection_window_size = size;
        self
    }

    #[must_use]
    pub fn auto_window_update(mut self, enabled: bool) -> Self {
        self.auto_window_update = enabled;
        self
    }

    #[must_use]
    pub fn use_huffman(mut self, enabled: bool) -> Self {
        self.use_huffman = enabled;
        self
    }

    #[must_use]
    pub fn max_encoder_table_size(mut self, size: usize) -> Self {
        self.max_encoder_table_size = size;
        self
    }

    #[must_use]
    pub fn closed_stream_grace(mut self, count: usize) -> Self {
        self.closed_stream_grace = count;
        self
    }
}
