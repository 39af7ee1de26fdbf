//! # HandLink-RS: Sensor Glove Link Reader
//!
//! Reads a glove controller's gyro and flex readings over a byte link and
//! turns them into smoothed, jitter-characterised motion data that drives a
//! skeletal pose. Link I/O runs on its own thread so the processing tick
//! never blocks.
//!
//! ## Architecture
//!
//! - **Backend**: Byte link, `#` packet framing and the reader thread
//! - **Processing**: Tolerant parser, exponential filters, windowed statistics
//! - **Pose**: Gyro to root orientation, flex to finger joints, calibration
//! - **Session**: The per-tick pipeline tying the above together
//! - **Communication**: Crossbeam channel from reader to tick, mutex-guarded
//!   snapshot slot from tick to renderer
//!
//! ## Configuration
//!
//! Session settings are read from TOML under the platform config directory
//! (`dev.handlink.handlink-rs/handlink.toml`); see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use handlink_rs::{
//!     backend::{LinkBackend, SerialLink},
//!     config::AppConfig,
//!     pose::MemoryRig,
//!     session::GloveSession,
//! };
//! use std::time::Duration;
//!
//! let config = AppConfig::load_or_default();
//! let link = SerialLink::open(&config.link)?;
//! let (backend, packets) = LinkBackend::new(Box::new(link), &config.link);
//! let reader = backend.spawn()?;
//!
//! let mut rig = MemoryRig::for_chains(&config.fingers);
//! let mut session = GloveSession::new(&config, packets, Some(reader), &rig);
//!
//! let dt = 1.0 / 60.0;
//! for i in 0..600u32 {
//!     session.tick(Duration::from_secs_f32(i as f32 * dt), dt, &mut rig);
//!     std::thread::sleep(Duration::from_secs_f32(dt));
//! }
//! println!("{}", session.snapshots().latest().render());
//! session.shutdown();
//! ```

pub mod backend;
pub mod config;
pub mod display;
pub mod error;
pub mod pose;
pub mod processing;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use backend::{LinkBackend, PacketReceiver, ReaderHandle};
pub use config::AppConfig;
pub use display::{DisplaySnapshot, SnapshotSlot};
pub use error::{HandLinkError, Result};
pub use pose::{MemoryRig, SkeletonRig};
pub use session::{GloveSession, TickReport};
pub use types::{Finger, LinkStatus, RawSample};
