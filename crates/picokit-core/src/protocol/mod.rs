//! Host frame protocol
//!
//! Requests and responses share one frame layout:
//!
//! ```text
//! [CODE:1] [LEN:2 LE] [PAYLOAD:LEN] [CRC8:1]
//! ```
//!
//! where CODE is the command byte of a request or the status byte of a
//! response, and the CRC covers the header and payload. Addresses inside
//! payloads are 4-byte little endian, lengths 2-byte little endian.

mod crc;
mod frame;
#[cfg(test)]
pub(crate) mod testing;

pub use crc::{crc8, frame_crc, FRAME_CRC};
pub use frame::{decode_frame, encode_frame, parse_header, read_request, send_response};

use core::fmt;

use crate::error::{Error, Result};

/// Maximum payload length of a frame
pub const MAX_PAYLOAD: usize = 256;
/// Header length: code byte plus 2-byte length
pub const HEADER_LEN: usize = 3;
/// Longest possible frame: header, payload and CRC
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD + 1;

/// String returned by [`Command::Version`]
pub const VERSION_STRING: &str = "picokit 1.0";

/// Frame payload storage
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

/// Host commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Identify the attached target
    Diag = 0x01,
    /// Bulk erase every region
    Erase = 0x02,
    /// Program one 128-byte flash row
    WritePage = 0x03,
    /// Program configuration bytes
    WriteConfig = 0x04,
    /// Program data EEPROM bytes
    WriteEeprom = 0x05,
    /// Read memory
    Read = 0x06,
    /// Release the target from programming mode
    ResetTarget = 0x07,
    /// Write and read back a pattern in data EEPROM
    TestEeprom = 0x08,
    /// Report the firmware version string
    Version = 0x09,
}

impl Command {
    /// All commands, in opcode order
    pub const ALL: [Command; 9] = [
        Command::Diag,
        Command::Erase,
        Command::WritePage,
        Command::WriteConfig,
        Command::WriteEeprom,
        Command::Read,
        Command::ResetTarget,
        Command::TestEeprom,
        Command::Version,
    ];

    /// Command name as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Diag => "DIAG",
            Self::Erase => "ERASE",
            Self::WritePage => "WRITE_PAGE",
            Self::WriteConfig => "WRITE_CONFIG",
            Self::WriteEeprom => "WRITE_EEPROM",
            Self::Read => "READ",
            Self::ResetTarget => "RESET_TARGET",
            Self::TestEeprom => "TEST_EEPROM",
            Self::Version => "VERSION",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Command::ALL
            .iter()
            .copied()
            .find(|cmd| *cmd as u8 == value)
            .ok_or(Error::UnknownCommand(value))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Command completed
    Ok = 0x00,
    /// Unknown command
    ErrCmd = 0x01,
    /// Request CRC mismatch
    ErrCrc = 0x02,
    /// Target not detected or link failure
    ErrTarget = 0x03,
    /// Verify failure (reserved, never emitted by the firmware)
    ErrVerify = 0x04,
    /// Malformed payload
    ErrPayload = 0x05,
}

impl Status {
    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::ErrCmd => "unknown command",
            Self::ErrCrc => "CRC mismatch",
            Self::ErrTarget => "target not detected",
            Self::ErrVerify => "verify failed",
            Self::ErrPayload => "invalid payload",
        }
    }

    /// Check if this is the success status
    pub fn is_ok(&self) -> bool {
        *self == Self::Ok
    }
}

impl TryFrom<u8> for Status {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Ok),
            0x01 => Ok(Self::ErrCmd),
            0x02 => Ok(Self::ErrCrc),
            0x03 => Ok(Self::ErrTarget),
            0x04 => Ok(Self::ErrVerify),
            0x05 => Ok(Self::ErrPayload),
            other => Err(Error::UnknownStatus(other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A validated request frame
///
/// The command byte is kept raw so that unknown commands can still be
/// answered with [`Status::ErrCmd`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Raw command byte
    pub cmd: u8,
    /// Request payload
    pub payload: Payload,
}

impl Request {
    /// Build a request from a command and payload
    pub fn new(cmd: Command, payload: &[u8]) -> Result<Self> {
        Ok(Self {
            cmd: cmd as u8,
            payload: Payload::from_slice(payload).map_err(|_| Error::BufferTooSmall)?,
        })
    }

    /// Decode the command byte
    pub fn command(&self) -> Result<Command> {
        Command::try_from(self.cmd)
    }

    /// Little-endian address field at the start of the payload
    pub fn address(&self) -> Result<u32> {
        read_u32_le(&self.payload, 0)
    }

    /// Little-endian length field following the address
    pub fn length(&self) -> Result<u16> {
        read_u16_le(&self.payload, 4)
    }
}

/// A response to be sent to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,
    /// Response payload
    pub payload: Payload,
}

impl Response {
    /// Success without payload
    pub fn ok() -> Self {
        Self::error(Status::Ok)
    }

    /// Status without payload
    pub fn error(status: Status) -> Self {
        Self {
            status,
            payload: Payload::new(),
        }
    }

    /// Success carrying a payload
    ///
    /// The payload type bounds the length, so any value fits in a frame.
    pub fn with_payload(payload: Payload) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }
}

/// Read a little-endian u32 at `offset`
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or(Error::MalformedPayload)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a little-endian u16 at `offset`
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    let bytes = data
        .get(offset..offset + 2)
        .ok_or(Error::MalformedPayload)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}
