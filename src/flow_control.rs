//! Flow-control window arithmetic (RFC 7540 Sections 5.2, 6.9).

use crate::error::ErrorKind;
use crate::frame::MAX_STREAM_ID;

const MAX_WINDOW: i64 = MAX_STREAM_ID as i64;

/// A credit counter. May go negative after SETTINGS_INITIAL_WINDOW_SIZE shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowWindow {
    window: i32,
}

impl FlowWindow {
    pub fn new(size: u32) -> Self {
        Self {
            window: size.min(MAX_STREAM_ID) as i32,
        }
    }

    pub fn available(&self) -> i32 {
        self.window
    }

    /// Bytes that may be sent right now (0 when negative).
    pub fn capacity(&self) -> usize {
        self.window.max(0) as usize
    }

    /// Take `n` bytes of credit; fails without side effects if short.
    ///
    /// Zero bytes always succeed, even on a negative window.
    pub fn consume(&mut self, n: u32) -> Result<(), ErrorKind> {
        if n == 0 {
            return Ok(());
        }
        if i64::from(n) > i64::from(self.window) {
            return Err(ErrorKind::FlowControl {
                requested: n as usize,
                available: i64::from(self.window),
            });
        }
        self.window -= n as i32;
        Ok(())
    }

    /// WINDOW_UPDATE: grow by `n`, never past 2^31-1.
    pub fn increase(&mut self, n: u32) -> Result<(), ErrorKind> {
        self.adjust(i64::from(n))
    }

    /// Apply a SETTINGS_INITIAL_WINDOW_SIZE delta.
    pub fn adjust(&mut self, delta: i64) -> Result<(), ErrorKind> {
        let next = i64::from(self.window) + delta;
        if next > MAX_WINDOW {
            return Err(ErrorKind::WindowOverflow);
        }
        // Saturate at i32::MIN.
        self.window = next.max(i64::from(i32::MIN)) as i32;
        Ok(())
    }
}

/// Receive side of a window, with deferred replenishment.
///
/// Received bytes stay charged until released; WINDOW_UPDATE is only
/// produced once the window drops to half of `target`.
#[derive(Debug, Clone)]
pub struct RecvWindow {
    window: FlowWindow,
    target: u32,
    /// Received but not yet released by the application.
    unreleased: u32,
    /// Released but not yet announced to the peer.
    pending_update: u32,
}

impl RecvWindow {
    pub fn new(target: u32) -> Self {
        Self {
            window: FlowWindow::new(target),
            target,
            unreleased: 0,
            pending_update: 0,
        }
    }

    /// Start from the protocol default and grow toward `target` (connection window).
    pub fn with_initial(initial: u32, target: u32) -> Self {
        Self {
            window: FlowWindow::new(initial),
            target,
            unreleased: 0,
            pending_update: target.saturating_sub(initial),
        }
    }

    pub fn available(&self) -> i32 {
        self.window.available()
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// Charge a received DATA frame; the peer overran us if this fails.
    pub fn receive(&mut self, len: u32) -> Result<(), ErrorKind> {
        self.window.consume(len)?;
        self.unreleased += len;
        Ok(())
    }

    /// Return capacity. Yields an increment to announce once worthwhile.
    pub fn release(&mut self, n: u32) -> Option<u32> {
        let n = n.min(self.unreleased);
        self.unreleased -= n;
        self.pending_update += n;
        self.take_update(false)
    }

    /// Announce the pending increment once the window is low, or now with `force`.
    pub fn take_update(&mut self, force: bool) -> Option<u32> {
        if self.pending_update == 0 {
            return None;
        }
        let low = i64::from(self.window.available()) <= i64::from(self.target / 2);
        if !(force || low) {
            return None;
        }
        let increment = self.pending_update;
        if self.window.increase(increment).is_err() {
            return None;
        }
        self.pending_update = 0;
        Some(increment)
    }

    /// Our own SETTINGS_INITIAL_WINDOW_SIZE changed.
    pub fn set_target(&mut self, target: u32) -> Result<(), ErrorKind> {
        self.window.adjust(i64::from(target) - i64::from(self.target))?;
        self.target = target;
        Ok(())
    }
}
