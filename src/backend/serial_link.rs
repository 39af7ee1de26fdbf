//! Serial port link to the glove
//!
//! Wraps a `serialport` handle behind [`ByteLink`]. Bluetooth SPP and USB CDC
//! adapters both show up as serial devices, so this is the only hardware
//! link needed.
//!
//! # Example
//!
//! ```ignore
//! use handlink_rs::backend::SerialLink;
//! use handlink_rs::config::LinkConfig;
//!
//! for port in SerialLink::list_ports() {
//!     println!("Found: {}", port);
//! }
//!
//! let link = SerialLink::open(&LinkConfig::default())?;
//! ```

use crate::config::LinkConfig;
use crate::error::{HandLinkError, Result};
use serialport::SerialPort;
use std::io::{ErrorKind, Read};
use std::time::Duration;

use super::link::ByteLink;

/// Read timeout on the port; `bytes_to_read` is checked first so this is
/// rarely hit
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A glove connected over a serial device
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
    baud_rate: u32,
}

impl SerialLink {
    /// Open the configured port
    pub fn open(config: &LinkConfig) -> Result<Self> {
        tracing::info!(
            "Opening serial port: {} at {} baud",
            config.port_name,
            config.baud_rate
        );

        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| {
                HandLinkError::Link(e)
                    .with_context(format!("Failed to open serial port {}", config.port_name))
            })?;

        tracing::info!("Connected to {}", config.port_name);

        Ok(Self {
            port,
            name: config.port_name.clone(),
            baud_rate: config.baud_rate,
        })
    }

    /// List serial device names visible to the OS
    pub fn list_ports() -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate serial ports: {}", e);
                Vec::new()
            }
        }
    }
}

impl ByteLink for SerialLink {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.port.bytes_to_read()? == 0 {
            return Ok(None);
        }

        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.name, self.baud_rate)
    }
}
