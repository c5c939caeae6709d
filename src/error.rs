//! Custom error types for the application.
//!
//! This module defines the primary error type, `SonarError`, for the library.
//! Using the `thiserror` crate, it gives one consistent place for the failures a
//! sweep can run into, from configuration and file I/O to malformed dumps and
//! device-level protocol faults.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment` while layering the configuration
//!   sources (defaults, TOML file, environment).
//! - **`Configuration`**: Semantic errors in a configuration that parsed fine but
//!   cannot drive a sweep (e.g. `start_angle > stop_angle`).
//! - **`Io`** / **`Csv`**: File-level failures while writing or re-reading dumps.
//! - **`DataBeforeAngle`** / **`InvalidSample`**: The raw dump is not in the shape
//!   the parser expects. A `data` line with no preceding `angle` line is always
//!   rejected rather than paired with a guessed angle.
//! - **`Protocol`**, **`Nack`**, **`Timeout`**: Problems talking to the sonar.
//! - **`SerialFeatureDisabled`**: The binary was built without serial support.
//!
//! Nothing here is retried. Every variant aborts the run that produced it.

use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type AppResult<T> = std::result::Result<T, SonarError>;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum SonarError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dump line {line}: data marker found before any angle marker")]
    DataBeforeAngle { line: usize },

    #[error("Dump line {line}: '{token}' is not a hexadecimal intensity (0-255)")]
    InvalidSample { line: usize, token: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Device rejected message {message_id}: {reason}")]
    Nack { message_id: u16, reason: String },

    #[error("Timed out waiting for message {expected}")]
    Timeout { expected: u16 },

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,
}

impl From<figment::Error> for SonarError {
    fn from(value: figment::Error) -> Self {
        SonarError::Config(Box::new(value))
    }
}

impl SonarError {
    /// Whether the error came from the shape of a raw dump rather than I/O.
    pub fn is_dump_format(&self) -> bool {
        matches!(
            self,
            SonarError::DataBeforeAngle { .. } | SonarError::InvalidSample { .. }
        )
    }
}
