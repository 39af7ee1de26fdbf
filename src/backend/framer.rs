//! Packet framer for the `#`-terminated text protocol
//!
//! Bytes accumulate until a `#` arrives; the accumulated bytes (terminator
//! stripped) form one packet. There is no escaping, checksum or length
//! prefix on the wire.
//!
//! The buffer is capped. When a packet grows past the cap the partial
//! buffer is thrown away and every byte up to and including the next `#`
//! is dropped, so the framer resumes on a clean packet boundary.

/// Packet terminator on the wire
pub const PACKET_TERMINATOR: u8 = b'#';

/// Result of pushing one byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A complete packet, terminator removed
    Packet(String),
    /// The buffer exceeded the cap and was discarded
    Overflow,
}

/// Assembles terminator-delimited packets from a byte stream
#[derive(Debug)]
pub struct PacketFramer {
    buffer: Vec<u8>,
    max_len: usize,
    /// Dropping bytes until the next terminator after an overflow
    resyncing: bool,
}

impl PacketFramer {
    /// Create a framer that accepts packets of at most `max_len` bytes
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            buffer: Vec::with_capacity(max_len.min(1024)),
            max_len,
            resyncing: false,
        }
    }

    /// Push one byte
    pub fn push(&mut self, byte: u8) -> Option<FrameEvent> {
        if byte == PACKET_TERMINATOR {
            if self.resyncing {
                self.resyncing = false;
                return None;
            }
            let packet = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            return Some(FrameEvent::Packet(packet));
        }

        if self.resyncing {
            return None;
        }

        if self.buffer.len() >= self.max_len {
            tracing::warn!(
                "Packet exceeded {} bytes without terminator, resyncing",
                self.max_len
            );
            self.buffer.clear();
            self.resyncing = true;
            return Some(FrameEvent::Overflow);
        }

        self.buffer.push(byte);
        None
    }

    /// Push a run of bytes, collecting completed packets
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        bytes
            .iter()
            .filter_map(|&b| match self.push(b) {
                Some(FrameEvent::Packet(p)) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Bytes buffered for the in-progress packet
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// True while dropping bytes after an overflow
    pub fn is_resyncing(&self) -> bool {
        self.resyncing
    }

    /// Drop any partial packet
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.resyncing = false;
    }
}
