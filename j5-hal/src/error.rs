//! Common error types for j5-hal.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.
//!
//! Capability and mode violations are detected locally, before anything is
//! written to the wire. The serial line itself only ever reports timeouts
//! and malformed responses.

use thiserror::Error;

/// Main error type for j5-hal operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The pin, board or firmware does not offer this capability.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The operation is valid for the hardware but not in its current mode.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An identifier or value is outside the range the board accepts.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// A derived component cannot be built from the supplied parts.
    #[error("Not supported by component: {0}")]
    NotSupportedByComponent(String),

    /// The board did not answer, or did not boot into known firmware.
    #[error("Board unresponsive: {0}")]
    BoardUnresponsive(String),

    /// The board runs firmware older than the minimum supported version.
    #[error("Firmware too old: found {found}, need at least {minimum}")]
    FirmwareTooOld { found: String, minimum: String },

    /// Malformed response, or an error reported by the firmware.
    #[error("Communication error: {0}")]
    Communication(String),

    /// The connection was closed; no further operations are possible.
    #[error("Connection to {0} is closed")]
    Closed(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
