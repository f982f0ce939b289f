//! Error types for picokit host operations

use picokit_core::protocol::{Command, Status};
use thiserror::Error;

/// Host-side picokit errors
#[derive(Debug, Error)]
pub enum PicokitError {
    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    /// The programmer did not answer in time
    #[error("Communication timeout")]
    Timeout,

    /// Response frame failed its CRC check
    #[error("Response CRC mismatch: got 0x{received:02X}, expected 0x{expected:02X}")]
    CrcMismatch {
        /// CRC computed over the received frame
        expected: u8,
        /// CRC byte carried by the frame
        received: u8,
    },

    /// The programmer answered with an error status
    #[error("{command} failed: {status}")]
    Device {
        /// Command that failed
        command: Command,
        /// Status returned by the programmer
        status: Status,
    },

    /// Response status byte is not a known status
    #[error("Unknown status 0x{0:02X}")]
    UnknownStatus(u8),

    /// Response does not have the expected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PicokitError {
    /// Whether resending the request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::IoError(_) | Self::SerialError(_) | Self::Timeout | Self::CrcMismatch { .. }
        )
    }
}

/// Result type for picokit host operations
pub type Result<T> = core::result::Result<T, PicokitError>;

impl From<std::io::Error> for PicokitError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => PicokitError::Timeout,
            _ => PicokitError::IoError(e.to_string()),
        }
    }
}
