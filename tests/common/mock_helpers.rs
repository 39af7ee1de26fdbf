//! Mock construction helpers

use handlink_rs::backend::{LinkBackend, PacketReceiver, ReaderHandle, ScriptedLink, SignalPattern, SyntheticGlove};
use handlink_rs::config::{AppConfig, LinkConfig};
use handlink_rs::pose::MemoryRig;

/// Link config with fast backoff so error paths finish quickly
pub fn fast_link_config() -> LinkConfig {
    LinkConfig {
        error_backoff_ms: 1,
        max_error_backoff_ms: 4,
        error_threshold: 3,
        ..LinkConfig::default()
    }
}

/// Spawn a reader over a scripted byte stream
pub fn spawn_scripted(link: ScriptedLink, config: &LinkConfig) -> (PacketReceiver, ReaderHandle) {
    let (backend, packets) = LinkBackend::new(Box::new(link), config);
    let reader = backend.spawn().expect("reader thread should spawn");
    (packets, reader)
}

/// Synthetic glove with a steady gyro and fully bent index finger
pub fn create_test_glove(rate_hz: f32) -> SyntheticGlove {
    SyntheticGlove::new(rate_hz)
        .with_gyro_pattern(0, SignalPattern::Constant(10.0))
        .with_gyro_pattern(1, SignalPattern::Constant(0.0))
        .with_gyro_pattern(2, SignalPattern::Constant(0.0))
        .with_flex_pattern(3, SignalPattern::Constant(1023.0))
}

/// Rig carrying every bone named by the default config
pub fn create_test_rig(config: &AppConfig) -> MemoryRig {
    MemoryRig::for_chains(&config.fingers)
}
