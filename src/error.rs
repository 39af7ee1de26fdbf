//! Error handling for HandLink-RS
//!
//! This module defines the crate error type and a Result alias. Errors only
//! surface at the edges (opening the link, loading configuration); the tick
//! path itself never fails and degrades instead.

use thiserror::Error;

/// Main error type for HandLink-RS operations
#[derive(Error, Debug)]
pub enum HandLinkError {
    /// Errors raised by the serial port layer
    #[error("Link error: {0}")]
    Link(#[from] serialport::Error),

    /// The link has been closed or is not open
    #[error("Link closed: {0}")]
    LinkClosed(String),

    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<HandLinkError>,
    },
}

impl HandLinkError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        HandLinkError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error means "try again later" rather than a broken link
    pub fn is_transient(&self) -> bool {
        match self {
            HandLinkError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            HandLinkError::WithContext { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Result type alias for HandLink-RS operations
pub type Result<T> = std::result::Result<T, HandLinkError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
