//! Configuration module for HandLink-RS
//!
//! Session configuration is fixed at startup: link identifier and baud rate,
//! filter coefficients, per-axis mapping, flex range and joint rates, finger
//! bone chains and statistics cadence. There is no hot reload.
//!
//! # Config Location
//!
//! The default file lives in the platform-appropriate config directory under
//! `dev.handlink.handlink-rs`:
//!
//! - **Linux**: `~/.config/dev.handlink.handlink-rs/handlink.toml`
//! - **macOS**: `~/Library/Application Support/dev.handlink.handlink-rs/handlink.toml`
//! - **Windows**: `%APPDATA%\dev.handlink.handlink-rs\handlink.toml`
//!
//! Every section is `#[serde(default)]`, so a partial file only overrides
//! what it names.
//!
//! # Example
//!
//! ```ignore
//! use handlink_rs::config::AppConfig;
//!
//! let config = AppConfig::load_or_default();
//! config.validate()?;
//! println!("reading {} at {} baud", config.link.port_name, config.link.baud_rate);
//! ```

use crate::error::{HandLinkError, Result, ResultExt};
use crate::types::Finger;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.handlink.handlink-rs";

/// Config filename
pub const CONFIG_FILE: &str = "handlink.toml";

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default maximum packet length before the framer resynchronises
pub const DEFAULT_MAX_PACKET_LEN: usize = 256;

/// Default smoothing coefficient for gyro and flex channels
pub const DEFAULT_FILTER_ALPHA: f32 = 0.1;

/// Default tick rate of the processing loop in Hz
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Link ====================

/// Byte link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial device (e.g. "/dev/rfcomm0", "COM20")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Longest packet accepted before the framer discards and resyncs
    pub max_packet_len: usize,
    /// First backoff after a read error, in milliseconds
    pub error_backoff_ms: u64,
    /// Backoff ceiling, in milliseconds
    pub max_error_backoff_ms: u64,
    /// Consecutive read errors before the link is reported broken
    pub error_threshold: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_name: default_port_name().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
            error_backoff_ms: 5,
            max_error_backoff_ms: 500,
            error_threshold: 50,
        }
    }
}

fn default_port_name() -> &'static str {
    if cfg!(windows) {
        "COM20"
    } else {
        "/dev/rfcomm0"
    }
}

// ==================== Filter ====================

/// Exponential smoothing coefficients
///
/// Lower values are smoother but slower; 0.1 settles within roughly
/// 100 ms at typical glove packet rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub gyro_alpha: f32,
    pub flex_alpha: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gyro_alpha: DEFAULT_FILTER_ALPHA,
            flex_alpha: DEFAULT_FILTER_ALPHA,
        }
    }
}

// ==================== Axes ====================

/// Physical gyro component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImuAxis {
    X,
    Y,
    Z,
}

/// Source of one logical rotation axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSource {
    pub source: ImuAxis,
    #[serde(default)]
    pub invert: bool,
}

impl AxisSource {
    pub const fn new(source: ImuAxis, invert: bool) -> Self {
        Self { source, invert }
    }
}

/// Mapping from filtered gyro components to pitch/yaw/roll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub pitch: AxisSource,
    pub yaw: AxisSource,
    pub roll: AxisSource,
    /// Degrees of rotation per gyro unit per second
    pub rotation_scale: f32,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            pitch: AxisSource::new(ImuAxis::Y, true),
            yaw: AxisSource::new(ImuAxis::X, false),
            roll: AxisSource::new(ImuAxis::Z, true),
            rotation_scale: 1.0,
        }
    }
}

// ==================== Flex ====================

/// Flex input range and joint dynamics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexConfig {
    /// Flex reading that maps to 0 degrees
    pub min: f32,
    /// Flex reading that maps to `max_angle_deg`
    pub max: f32,
    /// Bend angle at full flex
    pub max_angle_deg: f32,
    /// Interpolation rate (1/s) while closing
    pub flex_rate: f32,
    /// Interpolation rate (1/s) while opening
    pub relax_rate: f32,
}

impl Default for FlexConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1023.0,
            max_angle_deg: 90.0,
            flex_rate: 20.0,
            relax_rate: 10.0,
        }
    }
}

// ==================== Fingers ====================

/// Bone chain driven by one flex channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerChain {
    pub finger: Finger,
    pub bones: Vec<String>,
}

impl FingerChain {
    /// Three-bone chain named `<finger>.01` .. `<finger>.03`
    pub fn standard(finger: Finger) -> Self {
        let stem = finger.display_name().to_lowercase();
        Self {
            finger,
            bones: (1..=3).map(|i| format!("{stem}.{i:02}")).collect(),
        }
    }
}

fn default_chains() -> Vec<FingerChain> {
    Finger::DISPLAY_ORDER
        .iter()
        .copied()
        .map(FingerChain::standard)
        .collect()
}

// ==================== Stats / Runtime / Logging ====================

/// Statistics and display cadence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Smoothing of the displayed packet rate, per 1/60 s of frame time
    pub rate_smoothing: f32,
    /// How often the display snapshot is rebuilt
    pub display_interval_ms: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            rate_smoothing: 0.1,
            display_interval_ms: 250,
        }
    }
}

/// Processing loop settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tick_rate_hz: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files; stdout only when unset
    pub log_dir: Option<PathBuf>,
}

// ==================== App Config ====================

/// Complete session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub link: LinkConfig,
    pub filter: FilterConfig,
    pub axes: AxisConfig,
    pub flex: FlexConfig,
    pub fingers: Vec<FingerChain>,
    pub stats: StatsConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            filter: FilterConfig::default(),
            axes: AxisConfig::default(),
            flex: FlexConfig::default(),
            fingers: default_chains(),
            stats: StatsConfig::default(),
            runtime: RuntimeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(HandLinkError::from)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HandLinkError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the default config file, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save to a config file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| HandLinkError::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that would otherwise break the pipeline
    pub fn validate(&self) -> Result<()> {
        for (name, alpha) in [
            ("filter.gyro_alpha", self.filter.gyro_alpha),
            ("filter.flex_alpha", self.filter.flex_alpha),
        ] {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(HandLinkError::Config(format!(
                    "{} must be in (0, 1], got {}",
                    name, alpha
                )));
            }
        }
        if self.flex.max <= self.flex.min {
            return Err(HandLinkError::Config(format!(
                "flex.max ({}) must be greater than flex.min ({})",
                self.flex.max, self.flex.min
            )));
        }
        if self.flex.flex_rate <= 0.0 || self.flex.relax_rate <= 0.0 {
            return Err(HandLinkError::Config(
                "flex.flex_rate and flex.relax_rate must be positive".to_string(),
            ));
        }
        if self.link.max_packet_len == 0 {
            return Err(HandLinkError::Config(
                "link.max_packet_len must be at least 1".to_string(),
            ));
        }
        if self.runtime.tick_rate_hz == 0 {
            return Err(HandLinkError::Config(
                "runtime.tick_rate_hz must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
