//! Link Reader Thread Implementation
//!
//! This module contains the loop that owns the byte link for the lifetime of
//! a session. It pulls one byte at a time, frames packets and pushes each
//! completed packet into the queue consumed by the processing tick.
//!
//! # Responsibilities
//!
//! - **Polling**: yields for [`IDLE_SLEEP`] when no byte is available instead of spinning
//! - **Framing**: feeds [`PacketFramer`], counting overflow resyncs
//! - **Error handling**: logs read errors and keeps going, backing off
//!   exponentially; after a threshold of consecutive failures the link is
//!   reported [`LinkStatus::Broken`] while retries continue at the ceiling
//! - **Shutdown**: checks the cooperative running flag at the top of every
//!   iteration and hands the link back to the joiner, so the link is only
//!   released after the thread has stopped reading from it

use crate::backend::framer::{FrameEvent, PacketFramer};
use crate::backend::link::{ByteLink, LinkStats};
use crate::config::LinkConfig;
use crate::types::LinkStatus;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sleep when the link has no byte available
pub const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Outcome of a single reader iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    /// A byte was consumed; `true` if it completed a packet
    Byte { completed_packet: bool },
    /// No byte available
    Idle,
    /// Read failed; wait this long before retrying
    Failed { retry_after: Duration },
    /// The queue consumer is gone
    QueueClosed,
}

/// Exponential backoff for consecutive read errors
#[derive(Debug, Clone)]
pub struct ErrorBackoff {
    initial: Duration,
    max: Duration,
    threshold: u32,
    current: Duration,
    consecutive: u32,
}

impl ErrorBackoff {
    /// Create from link settings
    pub fn from_config(config: &LinkConfig) -> Self {
        let initial = Duration::from_millis(config.error_backoff_ms.max(1));
        Self {
            initial,
            max: Duration::from_millis(config.max_error_backoff_ms).max(initial),
            threshold: config.error_threshold.max(1),
            current: initial,
            consecutive: 0,
        }
    }

    /// Register a failure and return how long to wait
    pub fn on_error(&mut self) -> Duration {
        self.consecutive = self.consecutive.saturating_add(1);
        let wait = self.current;
        self.current = (self.current * 2).min(self.max);
        wait
    }

    /// Register a success
    pub fn on_success(&mut self) {
        self.consecutive = 0;
        self.current = self.initial;
    }

    /// True once the consecutive failure count reached the threshold
    pub fn is_tripped(&self) -> bool {
        self.consecutive >= self.threshold
    }

    /// Failures since the last success
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// Link status cell shared between the reader and its owner
#[derive(Debug, Clone, Default)]
pub struct SharedStatus(Arc<AtomicU8>);

impl SharedStatus {
    pub fn new(status: LinkStatus) -> Self {
        Self(Arc::new(AtomicU8::new(status.as_u8())))
    }

    pub fn get(&self) -> LinkStatus {
        LinkStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, status: LinkStatus) {
        self.0.store(status.as_u8(), Ordering::Release);
    }
}

/// The reader that runs the link polling loop
pub struct LinkReader {
    link: Box<dyn ByteLink>,
    framer: PacketFramer,
    packet_tx: Sender<String>,
    running: Arc<AtomicBool>,
    status: SharedStatus,
    /// Local counters, published on packet boundaries and errors
    stats: LinkStats,
    shared_stats: Arc<Mutex<LinkStats>>,
    backoff: ErrorBackoff,
}

impl LinkReader {
    /// Create a new reader
    pub fn new(
        link: Box<dyn ByteLink>,
        config: &LinkConfig,
        packet_tx: Sender<String>,
        running: Arc<AtomicBool>,
        status: SharedStatus,
        shared_stats: Arc<Mutex<LinkStats>>,
    ) -> Self {
        Self {
            link,
            framer: PacketFramer::new(config.max_packet_len),
            packet_tx,
            running,
            status,
            stats: LinkStats::default(),
            shared_stats,
            backoff: ErrorBackoff::from_config(config),
        }
    }

    /// Run the loop until the running flag clears or the queue closes
    ///
    /// Returns the link so the owner can release it after joining.
    pub fn run(mut self) -> Box<dyn ByteLink> {
        tracing::info!("Link reader started on {}", self.link.describe());
        self.status.set(LinkStatus::Connected);

        while self.running.load(Ordering::Acquire) {
            match self.step() {
                ReadStep::Byte { .. } => {}
                ReadStep::Idle => std::thread::sleep(IDLE_SLEEP),
                ReadStep::Failed { retry_after } => std::thread::sleep(retry_after),
                ReadStep::QueueClosed => {
                    tracing::warn!("Packet queue closed, stopping link reader");
                    break;
                }
            }
        }

        self.publish_stats();
        self.status.set(LinkStatus::Stopped);
        tracing::info!(
            "Link reader stopped ({} bytes, {} packets, {} errors)",
            self.stats.bytes_read,
            self.stats.packets_framed,
            self.stats.read_errors
        );
        self.link
    }

    /// Perform one read attempt
    pub fn step(&mut self) -> ReadStep {
        match self.link.read_byte() {
            Ok(Some(byte)) => {
                self.on_read_success();
                self.stats.record_byte();
                match self.framer.push(byte) {
                    Some(FrameEvent::Packet(packet)) => {
                        tracing::trace!("Framed packet: {}", packet);
                        if self.packet_tx.send(packet).is_err() {
                            return ReadStep::QueueClosed;
                        }
                        self.stats.packets_framed += 1;
                        self.publish_stats();
                        ReadStep::Byte {
                            completed_packet: true,
                        }
                    }
                    Some(FrameEvent::Overflow) => {
                        self.stats.overflow_resyncs += 1;
                        self.publish_stats();
                        ReadStep::Byte {
                            completed_packet: false,
                        }
                    }
                    None => ReadStep::Byte {
                        completed_packet: false,
                    },
                }
            }
            Ok(None) => {
                self.on_read_success();
                ReadStep::Idle
            }
            Err(e) if e.is_transient() => {
                tracing::trace!("Transient link condition: {}", e);
                ReadStep::Idle
            }
            Err(e) => {
                self.stats.record_error();
                let retry_after = self.backoff.on_error();
                tracing::error!("Link read error: {}", e);

                if self.backoff.is_tripped() && self.status.get() != LinkStatus::Broken {
                    tracing::error!(
                        "{} consecutive read errors on {}, link reported broken",
                        self.backoff.consecutive(),
                        self.link.describe()
                    );
                    self.status.set(LinkStatus::Broken);
                }
                self.publish_stats();
                ReadStep::Failed { retry_after }
            }
        }
    }

    fn on_read_success(&mut self) {
        if self.backoff.consecutive() > 0 {
            self.backoff.on_success();
            self.stats.consecutive_errors = 0;
            if self.status.get() == LinkStatus::Broken {
                tracing::info!("Link recovered");
            }
            self.status.set(LinkStatus::Connected);
            self.publish_stats();
        }
    }

    fn publish_stats(&self) {
        if let Ok(mut shared) = self.shared_stats.lock() {
            *shared = self.stats;
        }
    }
}
