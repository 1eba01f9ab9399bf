//! # Error Types
//!
//! Custom error types for DroneLog using `thiserror`.

use thiserror::Error;

/// Main error type for DroneLog
#[derive(Debug, Error)]
pub enum DroneLogError {
    /// SDI-12 protocol errors (malformed or truncated responses)
    #[error("SDI-12 protocol error: {0}")]
    Sdi12Protocol(String),

    /// No usable serial port for the SDI-12 adapter
    #[error("SDI-12 adapter not found: {0}")]
    SerialPortNotFound(String),

    /// Serial transport errors (open failures, timeouts, write failures)
    #[error("Serial error: {0}")]
    Serial(String),

    /// Position stream errors (gpsd connection or stream termination)
    #[error("GPS error: {0}")]
    Gps(String),

    /// Pressure sensor errors
    #[error("Pressure sensor error: {0}")]
    Baro(String),

    /// Status LED GPIO errors (only possible during pin setup)
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for DroneLog
pub type Result<T> = std::result::Result<T, DroneLogError>;
