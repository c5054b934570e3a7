//! HTTP/2 connection settings (RFC 7540 Section 6.5).

use crate::error::{ErrorKind, H2Error};
use crate::frame::{Setting, DEFAULT_MAX_FRAME_SIZE, MAX_MAX_FRAME_SIZE, MAX_STREAM_ID};

pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;
pub const MAX_INITIAL_WINDOW_SIZE: u32 = MAX_STREAM_ID;

/// One endpoint's view of a SETTINGS parameter set.
///
/// `None` means unbounded, the protocol default for the two optional limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: DEFAULT_HEADER_TABLE_SIZE,
            enable_push: true,
            max_concurrent_streams: None,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_list_size: None,
        }
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Apply one received parameter, enforcing the RFC 7540 §6.5.2 ranges.
    pub fn apply(&mut self, setting: Setting) -> Result<(), H2Error> {
        match setting {
            Setting::HeaderTableSize(v) => self.header_table_size = v,
            Setting::EnablePush(v) => {
                self.enable_push = match v {
                    0 => false,
                    1 => true,
                    _ => return Err(H2Error::connection(ErrorKind::InvalidSetting("ENABLE_PUSH must be 0 or 1"))),
                }
            }
            Setting::MaxConcurrentStreams(v) => self.max_concurrent_streams = Some(v),
            Setting::InitialWindowSize(v) => {
                if v > MAX_INITIAL_WINDOW_SIZE {
                    return Err(H2Error::connection(ErrorKind::WindowOverflow));
                }
                self.initial_window_size = v;
            }
            Setting::MaxFrameSize(v) => {
                if !(DEFAULT_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&v) {
                    return Err(H2Error::connection(ErrorKind::InvalidSetting(
                        "MAX_FRAME_SIZE outside 16384..=16777215",
                    )));
                }
                self.max_frame_size = v;
            }
            Setting::MaxHeaderListSize(v) => self.max_header_list_size = Some(v),
        }
        Ok(())
    }

    /// Check values before advertising them.
    pub fn validate(&self) -> Result<(), H2Error> {
        if self.initial_window_size > MAX_INITIAL_WINDOW_SIZE {
            return Err(H2Error::local(ErrorKind::InvalidSetting("INITIAL_WINDOW_SIZE above 2^31-1")));
        }
        if !(DEFAULT_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&self.max_frame_size) {
            return Err(H2Error::local(ErrorKind::InvalidSetting(
                "MAX_FRAME_SIZE outside 16384..=16777215",
            )));
        }
        Ok(())
    }

    /// Parameters that differ from `previous`, ready for a SETTINGS frame.
    pub fn diff(&self, previous: &Settings) -> Vec<Setting> {
        let mut out = Vec::new();
        if self.header_table_size != previous.header_table_size {
            out.push(Setting::HeaderTableSize(self.header_table_size));
        }
        if self.enable_push != previous.enable_push {
            out.push(Setting::EnablePush(u32::from(self.enable_push)));
        }
        // Going back to unbounded cannot be expressed on the wire.
        if let (Some(max), true) = (self.max_concurrent_streams, self.max_concurrent_streams != previous.max_concurrent_streams) {
            out.push(Setting::MaxConcurrentStreams(max));
        }
        if self.initial_window_size != previous.initial_window_size {
            out.push(Setting::InitialWindowSize(self.initial_window_size));
        }
        if self.max_frame_size != previous.max_frame_size {
            out.push(Setting::MaxFrameSize(self.max_frame_size));
        }
        if let (Some(max), true) = (self.max_header_list_size, self.max_header_list_size != previous.max_header_list_size) {
            out.push(Setting::MaxHeaderListSize(max));
        }
        out
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    #[must_use]
    pub fn header_table_size(mut self, size: u32) -> Self {
        self.settings.header_table_size = size;
        self
    }

    #[must_use]
    pub fn enable_push(mut self, enable: bool) -> Self {
        self.settings.enable_push = enable;
        self
    }

    #[must_use]
    pub fn max_concurrent_streams(mut self, max: u32) -> Self {
        self.settings.max_concurrent_streams = Some(max);
        self
    }

    #[must_use]
    pub fn initial_window_size(mut self, size: u32) -> Self {
        self.settings.initial_window_size = size;
        self
    }

    #[must_use]
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.settings.max_frame_size = size;
        self
    }

    #[must_use]
    pub fn max_header_list_size(mut self, size: u32) -> Self {
        self.settings.max_header_list_size = Some(size);
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}
