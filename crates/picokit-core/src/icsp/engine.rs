//! LVP session state machine and programming primitives

use bitflags::bitflags;

use super::link::{DataDirection, IcspLink, PinLevel};
use super::{opcodes, timing, LVP_KEY};
use crate::error::Result;
use crate::target::{CONFIG_START, DEVICE_ID_ADDR, EEPROM_START, FLASH_START, REVISION_ID_ADDR, USER_ID_START};

bitflags! {
    /// Memory regions selectable for bulk erase
    ///
    /// Bit assignment follows the PIC18 K42 ICSP erase command.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EraseRegions: u8 {
        /// Data EEPROM
        const EEPROM  = 1 << 0;
        /// Program flash
        const FLASH   = 1 << 1;
        /// User ID words
        const USER_ID = 1 << 2;
        /// Configuration words
        const CONFIG  = 1 << 3;
    }
}

impl EraseRegions {
    /// Bulk erase order and the PC value selecting each region.
    ///
    /// CONFIG must come first: on a code-protected part the flash erase is
    /// silently ignored until the configuration words have been erased.
    pub const ERASE_ORDER: [(EraseRegions, u32); 4] = [
        (EraseRegions::CONFIG, CONFIG_START),
        (EraseRegions::FLASH, FLASH_START),
        (EraseRegions::EEPROM, EEPROM_START),
        (EraseRegions::USER_ID, USER_ID_START),
    ];
}

/// Pack a payload into the 24-bit command field.
///
/// The value occupies bits 1..=22; bit 0 and the top bit are padding.
pub const fn encode_payload(payload: u32) -> [u8; 3] {
    [
        ((payload >> 15) & 0xFF) as u8,
        ((payload >> 7) & 0xFF) as u8,
        ((payload << 1) & 0xFF) as u8,
    ]
}

/// Unpack a 24-bit data field shifted out by the target.
///
/// Exact inverse of [`encode_payload`].
pub const fn decode_payload(bytes: [u8; 3]) -> u32 {
    ((bytes[0] as u32) << 15) | ((bytes[1] as u32) << 7) | ((bytes[2] as u32) >> 1)
}

/// Encode a full command into `buf`, returning the number of bytes used
pub fn encode_command(opcode: u8, payload: Option<u32>, buf: &mut [u8; 4]) -> usize {
    buf[0] = opcode;
    match payload {
        Some(payload) => {
            buf[1..].copy_from_slice(&encode_payload(payload));
            4
        }
        None => 1,
    }
}

/// ICSP engine
///
/// Owns the physical link and the LVP session flag. The flag starts
/// inactive and only [`enter_lvp`](Icsp::enter_lvp) and
/// [`exit_lvp`](Icsp::exit_lvp) change it.
pub struct Icsp<L: IcspLink> {
    link: L,
    lvp_active: bool,
}

impl<L: IcspLink> Icsp<L> {
    /// Create an engine with the target released (LVP inactive)
    pub fn new(link: L) -> Self {
        Self {
            link,
            lvp_active: false,
        }
    }

    /// Whether the target is currently held in LVP mode
    pub fn is_active(&self) -> bool {
        self.lvp_active
    }

    /// Get a reference to the link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Get a mutable reference to the link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consume the engine and return the link
    pub fn into_link(self) -> L {
        self.link
    }

    /// Enter LVP mode and return the session capability.
    ///
    /// Idempotent: if the target is already in LVP mode no pins are touched,
    /// so a sequence of requests can share one session.
    pub fn enter_lvp(&mut self) -> Result<LvpSession<'_, L>> {
        if !self.lvp_active {
            log::debug!("icsp: entering LVP");
            self.link.set_mclr(PinLevel::Low)?;
            self.link.delay_ms(timing::MCLR_SETTLE_MS);
            self.link.write(&LVP_KEY)?;
            self.link.delay_ms(timing::KEY_SETTLE_MS);
            self.lvp_active = true;
        }
        Ok(LvpSession { icsp: self })
    }

    /// Get the session if the target is already in LVP mode
    pub fn session(&mut self) -> Option<LvpSession<'_, L>> {
        if self.lvp_active {
            Some(LvpSession { icsp: self })
        } else {
            None
        }
    }

    /// Release the target from LVP mode. Idempotent.
    pub fn exit_lvp(&mut self) -> Result<()> {
        if self.lvp_active {
            log::debug!("icsp: leaving LVP");
            self.link.set_mclr(PinLevel::High)?;
            self.link.delay_ms(timing::LVP_EXIT_MS);
            self.lvp_active = false;
        }
        Ok(())
    }

    /// Block for at least `ms` milliseconds
    pub fn delay_ms(&mut self, ms: u32) {
        self.link.delay_ms(ms);
    }
}

/// Proof that the target is in LVP mode
///
/// Obtained from [`Icsp::enter_lvp`]. Dropping the session leaves the target
/// in LVP mode; call [`exit`](LvpSession::exit) to release it.
pub struct LvpSession<'a, L: IcspLink> {
    icsp: &'a mut Icsp<L>,
}

impl<L: IcspLink> LvpSession<'_, L> {
    /// Release the target from LVP mode, consuming the session
    pub fn exit(self) -> Result<()> {
        self.icsp.exit_lvp()
    }

    /// Block for at least `ms` milliseconds
    pub fn delay_ms(&mut self, ms: u32) {
        self.icsp.link.delay_ms(ms);
    }

    /// Clock out one command, with its payload if present.
    ///
    /// The encoded bytes go to the link in a single transfer.
    pub fn send_command(&mut self, opcode: u8, payload: Option<u32>) -> Result<()> {
        let mut buf = [0u8; 4];
        let len = encode_command(opcode, payload, &mut buf);
        log::trace!("icsp: cmd 0x{:02X} payload {:?}", opcode, payload);
        self.icsp.link.write(&buf[..len])
    }

    /// Set the target program counter
    pub fn load_pc(&mut self, addr: u32) -> Result<()> {
        self.send_command(opcodes::LOAD_PC, Some(addr))
    }

    /// Advance the target program counter
    pub fn increment_pc(&mut self) -> Result<()> {
        self.send_command(opcodes::INCREMENT_ADDRESS, None)
    }

    /// Bulk erase the selected regions, CONFIG first
    pub fn erase(&mut self, regions: EraseRegions) -> Result<()> {
        for (region, base) in EraseRegions::ERASE_ORDER {
            if regions.contains(region) {
                log::debug!("icsp: bulk erase {:?} @ 0x{:06X}", region, base);
                self.load_pc(base)?;
                self.send_command(opcodes::BULK_ERASE, None)?;
                self.delay_ms(timing::BULK_ERASE_MS);
            }
        }
        Ok(())
    }

    /// Erase the flash row addressed by PC
    pub fn erase_page(&mut self) -> Result<()> {
        self.send_command(opcodes::PAGE_ERASE, None)?;
        self.delay_ms(timing::PAGE_ERASE_MS);
        Ok(())
    }

    /// Read the word at PC, optionally incrementing PC afterwards.
    ///
    /// Returns `0xFFFF` without any bus activity if the link has no data
    /// input.
    pub fn read_data(&mut self, increment: bool) -> Result<u16> {
        if !self.icsp.link.has_data_in() {
            return Ok(0xFFFF);
        }
        let opcode = if increment {
            opcodes::READ_DATA_INCPC
        } else {
            opcodes::READ_DATA
        };
        self.send_command(opcode, None)?;

        let link = &mut self.icsp.link;
        link.set_data_direction(DataDirection::Input)?;
        let mut data = [0u8; 3];
        let read = link.read(&mut data);
        // Always hand the line back to the programmer, even after a failed read
        link.set_data_direction(DataDirection::Output)?;
        read?;

        Ok(decode_payload(data) as u16)
    }

    /// Latch a word and program it with an internally timed pulse
    pub fn write_data(&mut self, value: u16, increment: bool) -> Result<()> {
        let opcode = if increment {
            opcodes::LOAD_DATA_INCPC
        } else {
            opcodes::LOAD_DATA
        };
        self.send_command(opcode, Some(value as u32))?;
        self.send_command(opcodes::BEGIN_PROG_INT, None)?;
        self.icsp.link.delay_us(timing::WORD_PROGRAM_US);
        Ok(())
    }

    fn read_id(&mut self, addr: u32) -> Result<u16> {
        self.load_pc(addr)?;
        self.icsp.link.delay_us(timing::ID_READ_SETUP_US);
        self.read_data(false)
    }

    /// Read the device ID word
    pub fn device_id(&mut self) -> Result<u16> {
        self.read_id(DEVICE_ID_ADDR)
    }

    /// Read the revision ID word
    pub fn revision_id(&mut self) -> Result<u16> {
        self.read_id(REVISION_ID_ADDR)
    }

    /// Read `buf.len()` consecutive byte-wide locations (EEPROM) starting at `addr`
    pub fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.load_pc(addr)?;
        for byte in buf.iter_mut() {
            *byte = (self.read_data(true)? & 0xFF) as u8;
        }
        Ok(())
    }

    /// Program a flash row with a single programming pulse.
    ///
    /// All words but the last are latched with PC increment, the last one
    /// without, then one BEGIN_PROG_INT commits the whole batch.
    pub fn program_page(&mut self, addr: u32, words: &[u16], erase: bool) -> Result<()> {
        let Some((last, rest)) = words.split_last() else {
            return Ok(());
        };

        self.load_pc(addr)?;
        if erase {
            self.erase_page()?;
        }
        for &word in rest {
            self.send_command(opcodes::LOAD_DATA_INCPC, Some(word as u32))?;
        }
        self.send_command(opcodes::LOAD_DATA, Some(*last as u32))?;
        self.send_command(opcodes::BEGIN_PROG_INT, None)?;
        self.delay_ms(timing::ROW_PROGRAM_MS);
        Ok(())
    }

    /// Program byte-wide memory (EEPROM) one location at a time.
    ///
    /// Each write only commits the most recently latched byte, so every
    /// byte gets its own programming cycle.
    pub fn program_page_8bit(&mut self, addr: u32, data: &[u8], erase: bool) -> Result<()> {
        self.load_pc(addr)?;
        if erase {
            self.erase_page()?;
        }
        for &byte in data {
            self.write_data(byte as u16, true)?;
            self.delay_ms(timing::EEPROM_WRITE_MS);
        }
        Ok(())
    }

    /// Program configuration words from little-endian byte pairs.
    ///
    /// Every word is written, including ones that look erased: some
    /// protection bits do not return to 1 on erase. A trailing odd byte is
    /// padded with 0xFF in the high byte.
    pub fn program_config(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let mut offset = 0u32;
        for pair in data.chunks(2) {
            let word = u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0xFF)]);
            self.load_pc(addr.wrapping_add(offset))?;
            self.send_command(opcodes::LOAD_DATA, Some(word as u32))?;
            self.send_command(opcodes::BEGIN_PROG_INT, None)?;
            self.delay_ms(timing::CONFIG_WRITE_MS);
            offset = offset.wrapping_add(pair.len() as u32);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icsp::testing::{LinkEvent, RecordingLink};

    fn commands(link: &RecordingLink) -> heapless::Vec<(u8, Option<u32>), 512> {
        link.commands()
    }

    #[test]
    fn test_payload_round_trip() {
        for value in 0..=u16::MAX {
            let encoded = encode_payload(value as u32);
            assert_eq!(decode_payload(encoded) as u16, value);
        }
    }

    #[test]
    fn test_payload_layout() {
        assert_eq!(encode_payload(0xFFFF), [0x01, 0xFF, 0xFE]);
        assert_eq!(encode_payload(0x0001), [0x00, 0x00, 0x02]);
        // Device ID address uses the full 22-bit field
        assert_eq!(encode_payload(0x3FFFFE), [0x7F, 0xFF, 0xFC]);
    }

    #[test]
    fn test_encode_command() {
        let mut buf = [0u8; 4];
        assert_eq!(encode_command(opcodes::BULK_ERASE, None, &mut buf), 1);
        assert_eq!(buf[0], opcodes::BULK_ERASE);

        assert_eq!(encode_command(opcodes::LOAD_PC, Some(0x300000), &mut buf), 4);
        assert_eq!(buf, [0x80, 0x60, 0x00, 0x00]);
    }

    #[test]
    fn test_enter_lvp_is_idempotent() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.enter_lvp().unwrap();
        icsp.enter_lvp().unwrap();
        assert!(icsp.is_active());

        let events = icsp.link().events();
        assert_eq!(
            events.as_slice(),
            &[
                LinkEvent::Mclr(PinLevel::Low),
                LinkEvent::DelayUs(50_000),
                LinkEvent::Write(heapless::Vec::from_slice(b"MCHP").unwrap()),
                LinkEvent::DelayUs(5_000),
            ]
        );
    }

    #[test]
    fn test_exit_lvp_is_idempotent() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.exit_lvp().unwrap();
        assert!(icsp.link().events().is_empty());

        icsp.enter_lvp().unwrap().exit().unwrap();
        icsp.exit_lvp().unwrap();
        assert!(!icsp.is_active());
        let mclr: usize = icsp
            .link()
            .events()
            .iter()
            .filter(|e| matches!(e, LinkEvent::Mclr(_)))
            .count();
        assert_eq!(mclr, 2);
    }

    #[test]
    fn test_session_requires_active() {
        let mut icsp = Icsp::new(RecordingLink::new());
        assert!(icsp.session().is_none());
        icsp.enter_lvp().unwrap();
        assert!(icsp.session().is_some());
    }

    #[test]
    fn test_erase_orders_config_before_flash() {
        let mut icsp = Icsp::new(RecordingLink::new());
        let mut session = icsp.enter_lvp().unwrap();
        session
            .erase(EraseRegions::FLASH | EraseRegions::CONFIG | EraseRegions::EEPROM)
            .unwrap();

        let bases: heapless::Vec<u32, 8> = commands(icsp.link())
            .iter()
            .filter(|(op, _)| *op == opcodes::LOAD_PC)
            .filter_map(|(_, payload)| *payload)
            .collect();
        assert_eq!(bases.as_slice(), &[CONFIG_START, FLASH_START, EEPROM_START]);
    }

    #[test]
    fn test_erase_waits_after_each_region() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();
        icsp.session().unwrap().erase(EraseRegions::all()).unwrap();

        let events = icsp.link().events();
        let erase_delays = events
            .iter()
            .filter(|e| **e == LinkEvent::DelayUs(timing::BULK_ERASE_MS * 1000))
            .count();
        assert_eq!(erase_delays, 4);
        let erase_cmds = commands(icsp.link())
            .iter()
            .filter(|(op, payload)| *op == opcodes::BULK_ERASE && payload.is_none())
            .count();
        assert_eq!(erase_cmds, 4);
    }

    #[test]
    fn test_read_data_switches_direction() {
        let mut link = RecordingLink::new();
        link.queue_read(&encode_payload(0x6C20));
        let mut icsp = Icsp::new(link);
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();

        let value = icsp.session().unwrap().read_data(true).unwrap();
        assert_eq!(value, 0x6C20);
        assert_eq!(
            icsp.link().events().as_slice(),
            &[
                LinkEvent::Write(heapless::Vec::from_slice(&[opcodes::READ_DATA_INCPC]).unwrap()),
                LinkEvent::Direction(DataDirection::Input),
                LinkEvent::Read(3),
                LinkEvent::Direction(DataDirection::Output),
            ]
        );
    }

    #[test]
    fn test_read_data_without_input_line() {
        let mut link = RecordingLink::new();
        link.set_has_data_in(false);
        let mut icsp = Icsp::new(link);
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();

        assert_eq!(icsp.session().unwrap().read_data(false).unwrap(), 0xFFFF);
        assert!(icsp.link().events().is_empty());
    }

    #[test]
    fn test_device_id_sequence() {
        let mut link = RecordingLink::new();
        link.queue_read(&encode_payload(0x74E0));
        let mut icsp = Icsp::new(link);
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();

        assert_eq!(icsp.session().unwrap().device_id().unwrap(), 0x74E0);
        let events = icsp.link().events();
        assert_eq!(
            events[0],
            LinkEvent::Write(heapless::Vec::from_slice(&[0x80, 0x7F, 0xFF, 0xFC]).unwrap())
        );
        assert_eq!(events[1], LinkEvent::DelayUs(timing::ID_READ_SETUP_US));
        assert_eq!(
            events[2],
            LinkEvent::Write(heapless::Vec::from_slice(&[opcodes::READ_DATA]).unwrap())
        );
    }

    #[test]
    fn test_write_data_sequence() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();

        icsp.session().unwrap().write_data(0x00BB, false).unwrap();
        assert_eq!(
            commands(icsp.link()).as_slice(),
            &[(opcodes::LOAD_DATA, Some(0xBB)), (opcodes::BEGIN_PROG_INT, None)]
        );
        assert_eq!(
            icsp.link().events().last(),
            Some(&LinkEvent::DelayUs(timing::WORD_PROGRAM_US))
        );
    }

    #[test]
    fn test_read_bytes_keeps_low_byte() {
        let mut link = RecordingLink::new();
        link.queue_read(&encode_payload(0x12BB));
        link.queue_read(&encode_payload(0x34CC));
        let mut icsp = Icsp::new(link);
        let mut buf = [0u8; 2];
        icsp.enter_lvp().unwrap().read_bytes(EEPROM_START, &mut buf).unwrap();
        assert_eq!(buf, [0xBB, 0xCC]);
    }

    #[test]
    fn test_program_page_batches_row() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();

        let words = [0x1111u16, 0x2222, 0x3333];
        icsp.session().unwrap().program_page(0x100, &words, true).unwrap();
        assert_eq!(
            commands(icsp.link()).as_slice(),
            &[
                (opcodes::LOAD_PC, Some(0x100)),
                (opcodes::PAGE_ERASE, None),
                (opcodes::LOAD_DATA_INCPC, Some(0x1111)),
                (opcodes::LOAD_DATA_INCPC, Some(0x2222)),
                (opcodes::LOAD_DATA, Some(0x3333)),
                (opcodes::BEGIN_PROG_INT, None),
            ]
        );
        assert_eq!(
            icsp.link().events().last(),
            Some(&LinkEvent::DelayUs(timing::ROW_PROGRAM_MS * 1000))
        );
    }

    #[test]
    fn test_program_page_empty_is_noop() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();
        icsp.session().unwrap().program_page(0, &[], true).unwrap();
        assert!(icsp.link().events().is_empty());
    }

    #[test]
    fn test_program_page_8bit_one_cycle_per_byte() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();

        icsp.session()
            .unwrap()
            .program_page_8bit(EEPROM_START, &[0xAB, 0xCD], false)
            .unwrap();
        assert_eq!(
            commands(icsp.link()).as_slice(),
            &[
                (opcodes::LOAD_PC, Some(EEPROM_START)),
                (opcodes::LOAD_DATA_INCPC, Some(0xAB)),
                (opcodes::BEGIN_PROG_INT, None),
                (opcodes::LOAD_DATA_INCPC, Some(0xCD)),
                (opcodes::BEGIN_PROG_INT, None),
            ]
        );
        let settle = icsp
            .link()
            .events()
            .iter()
            .filter(|e| **e == LinkEvent::DelayUs(timing::EEPROM_WRITE_MS * 1000))
            .count();
        assert_eq!(settle, 2);
    }

    #[test]
    fn test_program_config_writes_erased_words() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();

        icsp.session()
            .unwrap()
            .program_config(CONFIG_START, &[0xFF; 16])
            .unwrap();
        let cmds = commands(icsp.link());
        let writes = cmds
            .iter()
            .filter(|(op, payload)| *op == opcodes::LOAD_DATA && *payload == Some(0xFFFF))
            .count();
        assert_eq!(writes, 8);
        let pulses = cmds
            .iter()
            .filter(|(op, _)| *op == opcodes::BEGIN_PROG_INT)
            .count();
        assert_eq!(pulses, 8);
    }

    #[test]
    fn test_program_config_pads_odd_byte() {
        let mut icsp = Icsp::new(RecordingLink::new());
        icsp.enter_lvp().unwrap();
        icsp.link_mut().clear();

        icsp.session()
            .unwrap()
            .program_config(CONFIG_START, &[0x34, 0x12, 0x56])
            .unwrap();
        assert_eq!(
            commands(icsp.link()).as_slice(),
            &[
                (opcodes::LOAD_PC, Some(CONFIG_START)),
                (opcodes::LOAD_DATA, Some(0x1234)),
                (opcodes::BEGIN_PROG_INT, None),
                (opcodes::LOAD_PC, Some(CONFIG_START + 2)),
                (opcodes::LOAD_DATA, Some(0xFF56)),
                (opcodes::BEGIN_PROG_INT, None),
            ]
        );
    }
}
