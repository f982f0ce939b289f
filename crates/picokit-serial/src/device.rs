//! picokit programmer client
//!
//! Speaks the frame protocol to the programmer and wraps each command in a
//! typed call.

use std::thread;
use std::time::Duration;

use picokit_core::protocol::{
    encode_frame, frame_crc, parse_header, Command, Status, HEADER_LEN, MAX_FRAME_LEN, MAX_PAYLOAD,
};
use picokit_core::target::{catalog, FLASH_ROW_BYTES};

use crate::error::{PicokitError, Result};
use crate::transport::Transport;

/// Bytes requested per READ command
pub const READ_CHUNK: usize = 128;

/// Bytes sent per WRITE_EEPROM command
pub const EEPROM_CHUNK: usize = 128;

/// Default number of attempts per request
pub const DEFAULT_RETRIES: u32 = 3;

/// Pause between attempts
const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Target identification returned by DIAG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device ID word
    pub device_id: u16,
    /// Revision ID word
    pub revision_id: u16,
    /// Part name as reported by the programmer
    pub name: String,
}

impl DeviceInfo {
    /// Silicon revision, e.g. `B2`: major letter from bits 10..6, minor number from bits 5..0
    pub fn revision(&self) -> String {
        let major = (b'A' + ((self.revision_id >> 6) & 0x1F) as u8) as char;
        let minor = self.revision_id & 0x3F;
        format!("{}{}", major, minor)
    }

    /// Flash size from the catalog, or 0 for unknown parts
    pub fn flash_size(&self) -> u32 {
        catalog::flash_size(self.device_id)
    }
}

/// picokit programmer
pub struct Picokit<T: Transport> {
    transport: T,
    retries: u32,
}

impl<T: Transport> Picokit<T> {
    /// Create a client on top of a transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retries: DEFAULT_RETRIES,
        }
    }

    /// Set the number of attempts per request (at least one)
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Get a mutable reference to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send a request and return the response status and payload.
    ///
    /// Transport errors and corrupted responses are retried; a status other
    /// than OK is returned to the caller as-is.
    pub fn send(&mut self, cmd: Command, payload: &[u8]) -> Result<(Status, Vec<u8>)> {
        if payload.len() > MAX_PAYLOAD {
            return Err(PicokitError::InvalidParameter(format!(
                "payload of {} bytes exceeds {}",
                payload.len(),
                MAX_PAYLOAD
            )));
        }
        let mut frame = [0u8; MAX_FRAME_LEN];
        let len = encode_frame(cmd as u8, payload, &mut frame)
            .map_err(|e| PicokitError::Protocol(e.to_string()))?;

        let mut attempt = 1;
        loop {
            match self.transact(&frame[..len]) {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    log::debug!("picokit: {} attempt {} failed: {}", cmd, attempt, e);
                    attempt += 1;
                    thread::sleep(RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn transact(&mut self, frame: &[u8]) -> Result<(Status, Vec<u8>)> {
        self.transport.clear_input()?;
        self.transport.write(frame)?;
        self.transport.flush()?;
        self.recv()
    }

    fn recv(&mut self) -> Result<(Status, Vec<u8>)> {
        let mut header = [0u8; HEADER_LEN];
        self.transport.read_exact(&mut header)?;
        let (status, len) = parse_header(header);
        if len as usize > MAX_PAYLOAD {
            return Err(PicokitError::Protocol(format!(
                "response length {} exceeds {}",
                len, MAX_PAYLOAD
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.transport.read_exact(&mut payload)?;
        let mut crc = [0u8; 1];
        self.transport.read_exact(&mut crc)?;

        let expected = frame_crc(&header, &payload);
        if crc[0] != expected {
            return Err(PicokitError::CrcMismatch {
                expected,
                received: crc[0],
            });
        }

        let status = Status::try_from(status).map_err(|_| PicokitError::UnknownStatus(status))?;
        Ok((status, payload))
    }

    /// Send a request and fail unless the programmer answers OK
    pub fn send_ok(&mut self, cmd: Command, payload: &[u8]) -> Result<Vec<u8>> {
        let (status, response) = self.send(cmd, payload)?;
        if !status.is_ok() {
            return Err(PicokitError::Device {
                command: cmd,
                status,
            });
        }
        Ok(response)
    }

    /// Firmware version string
    pub fn version(&mut self) -> Result<String> {
        let response = self.send_ok(Command::Version, &[])?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    /// Identify the attached target
    pub fn diag(&mut self) -> Result<DeviceInfo> {
        let response = self.send_ok(Command::Diag, &[])?;
        if response.len() < 4 {
            return Err(PicokitError::Protocol(format!(
                "DIAG response too short ({} bytes)",
                response.len()
            )));
        }
        Ok(DeviceInfo {
            device_id: u16::from_le_bytes([response[0], response[1]]),
            revision_id: u16::from_le_bytes([response[2], response[3]]),
            name: String::from_utf8_lossy(&response[4..]).into_owned(),
        })
    }

    /// Bulk erase flash, EEPROM, configuration and user ID
    pub fn erase(&mut self) -> Result<()> {
        self.send_ok(Command::Erase, &[])?;
        Ok(())
    }

    /// Program one flash row
    pub fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.len() != FLASH_ROW_BYTES {
            return Err(PicokitError::InvalidParameter(format!(
                "flash page must be {} bytes, got {}",
                FLASH_ROW_BYTES,
                data.len()
            )));
        }
        let mut payload = Vec::with_capacity(4 + FLASH_ROW_BYTES);
        payload.extend_from_slice(&addr.to_le_bytes());
        payload.extend_from_slice(data);
        self.send_ok(Command::WritePage, &payload)?;
        Ok(())
    }

    fn send_addr_data(&mut self, cmd: Command, addr: u32, data: &[u8]) -> Result<()> {
        if 6 + data.len() > MAX_PAYLOAD {
            return Err(PicokitError::InvalidParameter(format!(
                "{} bytes do not fit in one request",
                data.len()
            )));
        }
        let mut payload = Vec::with_capacity(6 + data.len());
        payload.extend_from_slice(&addr.to_le_bytes());
        payload.extend_from_slice(&(data.len() as u16).to_le_bytes());
        payload.extend_from_slice(data);
        self.send_ok(cmd, &payload)?;
        Ok(())
    }

    /// Program configuration bytes starting at `addr`
    pub fn write_config(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.send_addr_data(Command::WriteConfig, addr, data)
    }

    /// Program data EEPROM bytes starting at `addr`
    pub fn write_eeprom(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.send_addr_data(Command::WriteEeprom, addr, data)
    }

    /// Read up to [`MAX_PAYLOAD`] bytes starting at `addr`
    pub fn read(&mut self, addr: u32, len: usize) -> Result<Vec<u8>> {
        if len > MAX_PAYLOAD {
            return Err(PicokitError::InvalidParameter(format!(
                "read of {} bytes exceeds {}",
                len, MAX_PAYLOAD
            )));
        }
        let mut payload = [0u8; 6];
        payload[..4].copy_from_slice(&addr.to_le_bytes());
        payload[4..].copy_from_slice(&(len as u16).to_le_bytes());
        let response = self.send_ok(Command::Read, &payload)?;
        if response.len() != len {
            return Err(PicokitError::Protocol(format!(
                "READ returned {} bytes, expected {}",
                response.len(),
                len
            )));
        }
        Ok(response)
    }

    /// Read an arbitrary range in [`READ_CHUNK`] pieces.
    ///
    /// `progress` is called with the number of bytes read so far.
    pub fn read_range(
        &mut self,
        addr: u32,
        len: usize,
        mut progress: impl FnMut(usize),
    ) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(len);
        while data.len() < len {
            let n = READ_CHUNK.min(len - data.len());
            let chunk = self.read(addr + data.len() as u32, n)?;
            data.extend_from_slice(&chunk);
            progress(data.len());
        }
        Ok(data)
    }

    /// Release the target from programming mode
    pub fn reset_target(&mut self) -> Result<()> {
        self.send_ok(Command::ResetTarget, &[])?;
        Ok(())
    }

    /// Run the EEPROM write/read self-test; true on pass
    pub fn test_eeprom(&mut self) -> Result<bool> {
        let response = self.send_ok(Command::TestEeprom, &[])?;
        Ok(response.first().copied().unwrap_or(0) != 0)
    }
}
