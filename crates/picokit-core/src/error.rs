//! Error types for picokit-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Link errors
    /// The physical programming link reported a failure
    LinkError,

    // Transport errors
    /// Reading from or writing to the host byte stream failed
    TransportError,
    /// The host byte stream ended in the middle of a frame
    UnexpectedEof,

    // Frame errors
    /// A frame announced a payload longer than the protocol maximum
    FrameTooLarge {
        /// Announced payload length
        len: u16,
    },
    /// The CRC byte of a frame does not match its contents
    CrcMismatch {
        /// CRC computed over the received header and payload
        expected: u8,
        /// CRC byte carried by the frame
        received: u8,
    },
    /// A frame is shorter or longer than its length field says
    FrameLength,

    // Command errors
    /// The command byte is not one of the known commands
    UnknownCommand(u8),
    /// The status byte is not one of the known status codes
    UnknownStatus(u8),
    /// The payload is too short or its embedded length fields are inconsistent
    MalformedPayload,
    /// Provided buffer is too small for the operation
    BufferTooSmall,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkError => write!(f, "ICSP link failure"),
            Self::TransportError => write!(f, "host transport I/O error"),
            Self::UnexpectedEof => write!(f, "unexpected end of stream"),
            Self::FrameTooLarge { len } => {
                write!(f, "frame payload of {} bytes exceeds the maximum", len)
            }
            Self::CrcMismatch { expected, received } => write!(
                f,
                "CRC mismatch: expected 0x{:02X}, received 0x{:02X}",
                expected, received
            ),
            Self::FrameLength => write!(f, "frame length does not match its header"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command 0x{:02X}", cmd),
            Self::UnknownStatus(status) => write!(f, "unknown status 0x{:02X}", status),
            Self::MalformedPayload => write!(f, "malformed payload"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
