//! Command dispatcher
//!
//! Maps each host request onto an ICSP sequence and builds the response.
//! The dispatcher owns the engine, and with it the LVP session lifecycle:
//! DIAG, ERASE and TEST_EEPROM release the target when they finish, the
//! write and read commands leave it in LVP so consecutive pages share one
//! session, and RESET_TARGET releases it explicitly.

use embedded_io::{Read, Write};

use crate::error::{Error, Result};
use crate::icsp::{timing, EraseRegions, Icsp, IcspLink, LvpSession};
use crate::protocol::{
    read_request, send_response, Command, Payload, Request, Response, Status, MAX_PAYLOAD,
    VERSION_STRING,
};
use crate::target::{self, catalog, EEPROM_START, FLASH_ROW_BYTES, FLASH_ROW_WORDS};

/// Pattern written and read back by TEST_EEPROM
pub const EEPROM_TEST_PATTERN: [u8; 4] = [0xBB, 0xCC, 0xDD, 0xEE];

/// Length of the address + length prefix of config, EEPROM and read payloads
const ADDR_LEN_PREFIX: usize = 6;

/// The programmer: an ICSP engine driven by host requests
pub struct Programmer<L: IcspLink> {
    icsp: Icsp<L>,
}

impl<L: IcspLink> Programmer<L> {
    /// Create a programmer on top of a link, with the target released
    pub fn new(link: L) -> Self {
        Self {
            icsp: Icsp::new(link),
        }
    }

    /// Get a reference to the ICSP engine
    pub fn icsp(&self) -> &Icsp<L> {
        &self.icsp
    }

    /// Get a mutable reference to the ICSP engine
    pub fn icsp_mut(&mut self) -> &mut Icsp<L> {
        &mut self.icsp
    }

    /// Consume the programmer and return the link
    pub fn into_link(self) -> L {
        self.icsp.into_link()
    }

    /// Read one request from `io`, execute it and send the response.
    ///
    /// Frame-level failures are returned after any response they require
    /// has been sent; the caller just moves on to the next frame.
    pub fn process<T: Read + Write>(&mut self, io: &mut T) -> Result<()> {
        let request = read_request(io)?;
        let response = self.execute(&request);
        send_response(io, response.status, &response.payload)
    }

    /// Serve requests until the host stream ends
    pub fn serve<T: Read + Write>(&mut self, io: &mut T) {
        loop {
            match self.process(io) {
                Ok(()) => {}
                Err(Error::UnexpectedEof) => return,
                Err(e) => log::debug!("dispatch: frame dropped: {}", e),
            }
        }
    }

    /// Execute one request. Every request yields exactly one response.
    pub fn execute(&mut self, request: &Request) -> Response {
        let cmd = match request.command() {
            Ok(cmd) => cmd,
            Err(_) => {
                log::warn!("dispatch: unknown command 0x{:02X}", request.cmd);
                return Response::error(Status::ErrCmd);
            }
        };
        log::debug!("dispatch: {} ({} byte payload)", cmd, request.payload.len());

        let result = match cmd {
            Command::Diag => self.diag(),
            Command::Erase => self.erase(),
            Command::WritePage => self.write_page(request),
            Command::WriteConfig => self.write_config(request),
            Command::WriteEeprom => self.write_eeprom(request),
            Command::Read => self.read(request),
            Command::ResetTarget => self.reset_target(),
            Command::TestEeprom => self.test_eeprom(),
            Command::Version => version(),
        };

        match result {
            Ok(response) => response,
            Err(Error::MalformedPayload) => {
                log::warn!("dispatch: {}: malformed payload", cmd);
                Response::error(Status::ErrPayload)
            }
            Err(e) => {
                log::warn!("dispatch: {} failed: {}", cmd, e);
                Response::error(Status::ErrTarget)
            }
        }
    }

    /// Enter LVP and check that a target answers.
    ///
    /// Returns the session if the device ID looks valid. Otherwise the
    /// target is released again and `None` is returned.
    pub fn detect_target(&mut self) -> Result<Option<LvpSession<'_, L>>> {
        let mut session = self.icsp.enter_lvp()?;
        let id = session.device_id()?;
        if !target::is_present(id) {
            log::info!("dispatch: no target (device ID 0x{:04X})", id);
            session.exit()?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    fn diag(&mut self) -> Result<Response> {
        let mut session = self.icsp.enter_lvp()?;
        let device_id = session.device_id()?;
        let revision_id = session.revision_id()?;
        session.exit()?;

        if !target::is_present(device_id) {
            return Ok(Response::error(Status::ErrTarget));
        }
        let name = catalog::identify(device_id);
        log::info!(
            "dispatch: found {} (ID 0x{:04X}, rev 0x{:04X})",
            name,
            device_id,
            revision_id
        );

        let mut payload = Payload::new();
        payload
            .extend_from_slice(&device_id.to_le_bytes())
            .and_then(|_| payload.extend_from_slice(&revision_id.to_le_bytes()))
            .and_then(|_| payload.extend_from_slice(name.as_bytes()))
            .map_err(|_| Error::BufferTooSmall)?;
        Ok(Response::with_payload(payload))
    }

    fn erase(&mut self) -> Result<Response> {
        let Some(mut session) = self.detect_target()? else {
            return Ok(Response::error(Status::ErrTarget));
        };
        session.erase(EraseRegions::all())?;
        session.exit()?;
        Ok(Response::ok())
    }

    fn write_page(&mut self, request: &Request) -> Result<Response> {
        let payload = &request.payload[..];
        if payload.len() < 4 + FLASH_ROW_BYTES {
            return Err(Error::MalformedPayload);
        }
        let addr = request.address()?;

        let mut words = [0u16; FLASH_ROW_WORDS];
        for (word, pair) in words.iter_mut().zip(payload[4..].chunks_exact(2)) {
            *word = u16::from_le_bytes([pair[0], pair[1]]);
        }

        // The session stays open for the following pages
        self.icsp.enter_lvp()?.program_page(addr, &words, true)?;
        Ok(Response::ok())
    }

    fn write_config(&mut self, request: &Request) -> Result<Response> {
        let (addr, data) = split_addr_data(request)?;
        self.icsp.enter_lvp()?.program_config(addr, data)?;
        Ok(Response::ok())
    }

    fn write_eeprom(&mut self, request: &Request) -> Result<Response> {
        let (addr, data) = split_addr_data(request)?;
        self.icsp.enter_lvp()?.program_page_8bit(addr, data, false)?;
        Ok(Response::ok())
    }

    fn read(&mut self, request: &Request) -> Result<Response> {
        let (addr, len) = split_addr_len(request)?;
        if len > MAX_PAYLOAD {
            return Err(Error::MalformedPayload);
        }

        let mut buf = Payload::new();
        buf.resize(len, 0).map_err(|_| Error::BufferTooSmall)?;

        let mut session = self.icsp.enter_lvp()?;
        if addr >= EEPROM_START {
            session.read_bytes(addr, &mut buf)?;
        } else {
            // Words unpack little endian; an odd tail keeps the low byte
            session.load_pc(addr)?;
            for chunk in buf.chunks_mut(2) {
                let word = session.read_data(true)?.to_le_bytes();
                chunk.copy_from_slice(&word[..chunk.len()]);
            }
        }
        Ok(Response::with_payload(buf))
    }

    fn reset_target(&mut self) -> Result<Response> {
        self.icsp.exit_lvp()?;
        self.icsp.delay_ms(timing::RESET_HOLD_MS);
        Ok(Response::ok())
    }

    fn test_eeprom(&mut self) -> Result<Response> {
        let Some(mut session) = self.detect_target()? else {
            return Ok(Response::error(Status::ErrTarget));
        };
        session.erase(EraseRegions::EEPROM)?;
        session.exit()?;
        self.icsp.delay_ms(timing::SELF_TEST_COOLDOWN_MS);

        let mut session = self.icsp.enter_lvp()?;
        session.load_pc(EEPROM_START)?;
        for &byte in &EEPROM_TEST_PATTERN {
            session.write_data(byte as u16, false)?;
            session.delay_ms(timing::EEPROM_WRITE_MS);
            session.increment_pc()?;
        }
        session.exit()?;
        self.icsp.delay_ms(timing::SELF_TEST_COOLDOWN_MS);

        let mut readback = [0u8; EEPROM_TEST_PATTERN.len()];
        let mut session = self.icsp.enter_lvp()?;
        session.read_bytes(EEPROM_START, &mut readback)?;
        session.exit()?;

        let pass = readback == EEPROM_TEST_PATTERN;
        if !pass {
            log::warn!("dispatch: EEPROM self-test read back {:02X?}", readback);
        }
        let mut payload = Payload::new();
        payload.push(pass as u8).map_err(|_| Error::BufferTooSmall)?;
        Ok(Response::with_payload(payload))
    }
}

fn version() -> Result<Response> {
    let payload = Payload::from_slice(VERSION_STRING.as_bytes()).map_err(|_| Error::BufferTooSmall)?;
    Ok(Response::with_payload(payload))
}

fn split_addr_len(request: &Request) -> Result<(u32, usize)> {
    Ok((request.address()?, request.length()? as usize))
}

/// Split an `addr(4) len(2) data(len)` payload. Extra trailing bytes are ignored.
fn split_addr_data(request: &Request) -> Result<(u32, &[u8])> {
    let (addr, len) = split_addr_len(request)?;
    let data = request
        .payload
        .get(ADDR_LEN_PREFIX..ADDR_LEN_PREFIX + len)
        .ok_or(Error::MalformedPayload)?;
    Ok((addr, data))
}
