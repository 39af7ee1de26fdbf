//! ByteLink trait for a unified link interface
//!
//! This module provides a common trait for all byte sources the reader
//! thread can pull from: a real serial port, a scripted buffer for tests, or
//! a synthetic glove for running without hardware.

use crate::error::Result;

/// Counters maintained by the reader thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Total bytes read from the link
    pub bytes_read: u64,
    /// Packets handed to the queue
    pub packets_framed: u64,
    /// Times the framer discarded an oversized buffer
    pub overflow_resyncs: u64,
    /// Total read errors
    pub read_errors: u64,
    /// Read errors since the last successful read
    pub consecutive_errors: u32,
}

impl LinkStats {
    /// Record a byte read
    #[inline]
    pub fn record_byte(&mut self) {
        self.bytes_read += 1;
        self.consecutive_errors = 0;
    }

    /// Record a failed read
    pub fn record_error(&mut self) {
        self.read_errors += 1;
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Unified interface for glove byte links
///
/// Implementations must be `Send` so they can be moved into the reader
/// thread.
///
/// # Example
///
/// ```ignore
/// fn pump(link: &mut dyn ByteLink, framer: &mut PacketFramer) -> Result<()> {
///     while let Some(byte) = link.read_byte()? {
///         framer.push(byte);
///     }
///     Ok(())
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ByteLink: Send {
    /// Read one byte
    ///
    /// Returns `Ok(None)` when no byte is currently available; the reader
    /// then yields briefly and retries.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Human-readable identifier for logs
    fn describe(&self) -> String;
}
