//! Backend module for the glove byte link
//!
//! This module owns all link I/O. Reading happens on a dedicated thread so
//! the processing tick never blocks on the link; completed packets cross to
//! the tick through an unbounded crossbeam channel.
//!
//! # Architecture
//!
//! - [`LinkBackend`] - Wires a [`ByteLink`] to a packet queue and spawns the reader
//! - [`ReaderHandle`] - Owner-side handle: status, counters, cooperative stop + join
//! - [`PacketReceiver`] - Tick-side end of the queue, drained once per tick
//!
//! # Components
//!
//! - [`SerialLink`] - Real hardware over a serial device
//! - [`ScriptedLink`] / [`SyntheticGlove`] - In-memory links for tests and demos
//! - [`PacketFramer`] - `#`-terminated framing with a length cap
//! - [`LinkReader`] - The polling loop itself
//!
//! # Example
//!
//! ```ignore
//! use handlink_rs::backend::{LinkBackend, SerialLink};
//! use handlink_rs::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let link = SerialLink::open(&config.link)?;
//! let (backend, packets) = LinkBackend::new(Box::new(link), &config.link);
//! let mut reader = backend.spawn()?;
//!
//! // Once per tick
//! for packet in packets.drain() {
//!     // parse, filter, map
//! }
//!
//! reader.stop();
//! ```

pub mod framer;
pub mod link;
pub mod mock_link;
pub mod reader;
pub mod serial_link;

pub use framer::{FrameEvent, PacketFramer, PACKET_TERMINATOR};
pub use link::{ByteLink, LinkStats};
pub use mock_link::{ScriptedLink, SignalPattern, SyntheticGlove};
pub use reader::{ErrorBackoff, LinkReader, ReadStep, SharedStatus, IDLE_SLEEP};
pub use serial_link::SerialLink;

use crate::config::LinkConfig;
use crate::error::{HandLinkError, Result};
use crate::types::LinkStatus;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Tick-side end of the packet queue
#[derive(Debug, Clone)]
pub struct PacketReceiver {
    receiver: Receiver<String>,
}

impl PacketReceiver {
    /// A receiver that never yields packets (link failed to open)
    pub fn disconnected() -> Self {
        let (_, receiver) = unbounded();
        Self { receiver }
    }

    /// A queue fed directly by the caller instead of a reader thread
    pub fn channel() -> (Sender<String>, Self) {
        let (sender, receiver) = unbounded();
        (sender, Self { receiver })
    }

    /// Try to receive a single packet without blocking
    pub fn try_recv(&self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// Iterate over the packets queued at the moment of the call
    ///
    /// Packets that arrive while draining are left for the next tick, so a
    /// fast producer cannot keep one tick busy indefinitely.
    pub fn drain(&self) -> impl Iterator<Item = String> + '_ {
        let backlog = self.receiver.len();
        self.receiver.try_iter().take(backlog)
    }

    /// Number of packets currently queued
    pub fn backlog(&self) -> usize {
        self.receiver.len()
    }
}

/// Link plus queue, ready to be spawned
pub struct LinkBackend {
    reader: LinkReader,
    running: Arc<AtomicBool>,
    status: SharedStatus,
    stats: Arc<Mutex<LinkStats>>,
}

impl LinkBackend {
    /// Create a backend for `link` with its packet queue
    pub fn new(link: Box<dyn ByteLink>, config: &LinkConfig) -> (Self, PacketReceiver) {
        let (packet_tx, packet_rx): (Sender<String>, Receiver<String>) = unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let status = SharedStatus::new(LinkStatus::Disconnected);
        let stats = Arc::new(Mutex::new(LinkStats::default()));

        let reader = LinkReader::new(
            link,
            config,
            packet_tx,
            running.clone(),
            status.clone(),
            stats.clone(),
        );

        (
            Self {
                reader,
                running,
                status,
                stats,
            },
            PacketReceiver {
                receiver: packet_rx,
            },
        )
    }

    /// Get a handle to stop the reader
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Start the reader thread
    pub fn spawn(self) -> Result<ReaderHandle> {
        let LinkBackend {
            reader,
            running,
            status,
            stats,
        } = self;

        let thread = std::thread::Builder::new()
            .name("handlink-reader".to_string())
            .spawn(move || reader.run())
            .map_err(|e| HandLinkError::Io(e).with_context("Failed to spawn link reader"))?;

        Ok(ReaderHandle {
            running,
            status,
            stats,
            thread: Some(thread),
        })
    }
}

/// Owner-side handle to a running reader thread
pub struct ReaderHandle {
    running: Arc<AtomicBool>,
    status: SharedStatus,
    stats: Arc<Mutex<LinkStats>>,
    thread: Option<JoinHandle<Box<dyn ByteLink>>>,
}

impl ReaderHandle {
    /// Current link status
    pub fn status(&self) -> LinkStatus {
        self.status.get()
    }

    /// Latest published counters
    pub fn stats(&self) -> LinkStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    /// True until [`ReaderHandle::stop`] has joined the thread
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Signal the reader to stop, join it, then release the link
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        match thread.join() {
            Ok(link) => {
                tracing::debug!("Releasing link {}", link.describe());
                drop(link);
            }
            Err(_) => {
                tracing::error!("Link reader thread panicked");
                self.status.set(LinkStatus::Stopped);
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for_backlog(packets: &PacketReceiver, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while packets.backlog() < count && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_backend_creation() {
        let (backend, packets) =
            LinkBackend::new(Box::new(ScriptedLink::new()), &LinkConfig::default());

        assert!(backend.stop_handle().load(Ordering::SeqCst));
        assert_eq!(backend.status.get(), LinkStatus::Disconnected);
        assert_eq!(packets.backlog(), 0);
    }

    #[test]
    fn test_spawn_read_and_stop() {
        let link = ScriptedLink::from_bytes(b"A1#B2#C3#");
        let (backend, packets) = LinkBackend::new(Box::new(link), &LinkConfig::default());
        let mut reader = backend.spawn().unwrap();

        wait_for_backlog(&packets, 3);
        assert_eq!(reader.status(), LinkStatus::Connected);

        let drained: Vec<String> = packets.drain().collect();
        assert_eq!(drained, vec!["A1", "B2", "C3"]);

        reader.stop();
        assert!(!reader.is_running());
        assert_eq!(reader.status(), LinkStatus::Stopped);
        assert_eq!(reader.stats().packets_framed, 3);

        // Stopping twice is harmless
        reader.stop();
    }

    #[test]
    fn test_drain_takes_only_current_backlog() {
        let (tx, rx) = unbounded();
        let packets = PacketReceiver { receiver: rx };
        tx.send("A1".to_string()).unwrap();
        tx.send("A2".to_string()).unwrap();

        let mut seen = Vec::new();
        for p in packets.drain() {
            // Producer keeps pushing while we drain
            tx.send(format!("late-{p}")).unwrap();
            seen.push(p);
        }
        assert_eq!(seen, vec!["A1", "A2"]);
        assert_eq!(packets.backlog(), 2);
    }

    #[test]
    fn test_disconnected_receiver_is_empty() {
        let packets = PacketReceiver::disconnected();
        assert_eq!(packets.drain().count(), 0);
        assert!(packets.try_recv().is_none());
    }
}
