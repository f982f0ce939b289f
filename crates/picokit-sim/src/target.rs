//! Simulated PIC18 target

use alloc::vec;
use alloc::vec::Vec;

use picokit_core::error::{Error, Result};
use picokit_core::icsp::{decode_payload, encode_payload, opcodes, timing};
use picokit_core::icsp::{DataDirection, IcspLink, PinLevel, LVP_KEY};
use picokit_core::target::{
    MemoryRegion, CONFIG_START, DEVICE_ID_ADDR, EEPROM_START, FLASH_ROW_BYTES, REVISION_ID_ADDR,
    USER_ID_START,
};

/// Configuration for the simulated part
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Value of the device ID word
    pub device_id: u16,
    /// Value of the revision ID word
    pub revision_id: u16,
    /// Flash size in bytes
    pub flash_size: usize,
    /// EEPROM size in bytes
    pub eeprom_size: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            device_id: 0x6C20,   // PIC18F27K42
            revision_id: 0xA042, // rev B2
            flash_size: 128 * 1024,
            eeprom_size: 1024,
        }
    }
}

/// Observable event on the simulated link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// MCLR driven
    Mclr(PinLevel),
    /// LVP key accepted
    EnteredLvp,
    /// Command decoded while in LVP mode
    Command {
        /// Opcode
        opcode: u8,
        /// Decoded payload, for opcodes that carry one
        payload: Option<u32>,
    },
    /// Word shifted out to the programmer
    Read(u16),
    /// Programmer delay in microseconds
    Delay(u32),
}

/// Simulated PIC18 target behind an ICSP link
///
/// Commands are only decoded after MCLR has been pulled low and the LVP key
/// clocked in. The simulator also checks that the programmer waits out
/// erase and programming cycles; commands arriving early are counted in
/// [`timing_violations`](SimTarget::timing_violations).
pub struct SimTarget {
    config: SimConfig,
    attached: bool,
    flash: Vec<u8>,
    user_id: [u8; 16],
    config_words: [u8; 16],
    eeprom: Vec<u8>,

    mclr: PinLevel,
    in_lvp: bool,
    direction: DataDirection,
    pc: u32,
    latches: Vec<(u32, u16)>,
    output: Option<u16>,

    busy_us: u32,
    elapsed_us: u64,
    timing_violations: usize,
    events: Vec<SimEvent>,
}

impl SimTarget {
    /// Create a simulated target, all memories erased
    pub fn new(config: SimConfig) -> Self {
        let flash = vec![0xFF; config.flash_size];
        let eeprom = vec![0xFF; config.eeprom_size];
        Self {
            config,
            attached: true,
            flash,
            user_id: [0xFF; 16],
            config_words: [0xFF; 16],
            eeprom,
            mclr: PinLevel::High,
            in_lvp: false,
            direction: DataDirection::Output,
            pc: 0,
            latches: Vec::new(),
            output: None,
            busy_us: 0,
            elapsed_us: 0,
            timing_violations: 0,
            events: Vec::new(),
        }
    }

    /// Create a simulated PIC18F27K42
    pub fn new_default() -> Self {
        Self::new(SimConfig::default())
    }

    /// Model an empty socket: nothing answers and the data line floats high
    pub fn detached() -> Self {
        let mut sim = Self::new_default();
        sim.attached = false;
        sim
    }

    /// Get the configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Program flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Mutable program flash contents
    pub fn flash_mut(&mut self) -> &mut [u8] {
        &mut self.flash
    }

    /// Configuration bytes
    pub fn config_bytes(&self) -> &[u8; 16] {
        &self.config_words
    }

    /// Mutable configuration bytes
    pub fn config_bytes_mut(&mut self) -> &mut [u8; 16] {
        &mut self.config_words
    }

    /// User ID bytes
    pub fn user_id(&self) -> &[u8; 16] {
        &self.user_id
    }

    /// Data EEPROM contents
    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    /// Mutable data EEPROM contents
    pub fn eeprom_mut(&mut self) -> &mut [u8] {
        &mut self.eeprom
    }

    /// Whether the target is in LVP mode
    pub fn in_lvp(&self) -> bool {
        self.in_lvp
    }

    /// Current program counter
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Every event seen on the link
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Forget recorded events
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Decoded commands, in order
    pub fn commands(&self) -> impl Iterator<Item = (u8, Option<u32>)> + '_ {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Command { opcode, payload } => Some((*opcode, *payload)),
            _ => None,
        })
    }

    /// Total time the programmer has spent in delays
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// Number of commands clocked in before a previous cycle finished
    pub fn timing_violations(&self) -> usize {
        self.timing_violations
    }

    fn set_busy(&mut self, us: u32) {
        self.busy_us = self.busy_us.max(us);
    }

    fn advance_pc(&mut self) {
        let step = match MemoryRegion::from_address(self.pc) {
            Some(region) if region.is_byte_wide() => 1,
            _ => 2,
        };
        self.pc = (self.pc + step) & 0x3F_FFFF;
    }

    fn read_word(&self, addr: u32) -> u16 {
        let word_at = |mem: &[u8], offset: usize| -> u16 {
            let offset = offset & !1;
            match mem.get(offset..offset + 2) {
                Some(bytes) => u16::from_le_bytes([bytes[0], bytes[1]]),
                None => 0xFFFF,
            }
        };
        match MemoryRegion::from_address(addr) {
            Some(MemoryRegion::Flash) => word_at(&self.flash, addr as usize),
            Some(MemoryRegion::UserId) => word_at(&self.user_id, (addr - USER_ID_START) as usize),
            Some(MemoryRegion::Config) => word_at(&self.config_words, (addr - CONFIG_START) as usize),
            Some(MemoryRegion::Eeprom) => self
                .eeprom
                .get((addr - EEPROM_START) as usize)
                .map_or(0xFFFF, |&b| b as u16),
            Some(MemoryRegion::DeviceId) if addr & !1 == DEVICE_ID_ADDR => self.config.device_id,
            Some(MemoryRegion::DeviceId) if addr & !1 == REVISION_ID_ADDR => self.config.revision_id,
            _ => 0xFFFF,
        }
    }

    fn program_word(&mut self, addr: u32, word: u16) {
        let bytes = word.to_le_bytes();
        match MemoryRegion::from_address(addr) {
            Some(MemoryRegion::Flash) => {
                let offset = addr as usize & !1;
                if let Some(cells) = self.flash.get_mut(offset..offset + 2) {
                    // Programming can only clear bits
                    cells[0] &= bytes[0];
                    cells[1] &= bytes[1];
                }
            }
            Some(MemoryRegion::UserId) => {
                let offset = (addr - USER_ID_START) as usize & !1;
                self.user_id[offset..offset + 2].copy_from_slice(&bytes);
            }
            Some(MemoryRegion::Config) => {
                let offset = (addr - CONFIG_START) as usize & !1;
                self.config_words[offset..offset + 2].copy_from_slice(&bytes);
            }
            Some(MemoryRegion::Eeprom) => {
                if let Some(cell) = self.eeprom.get_mut((addr - EEPROM_START) as usize) {
                    *cell = bytes[0];
                }
            }
            _ => log::warn!("sim: write to read-only address 0x{:06X}", addr),
        }
    }

    fn bulk_erase(&mut self) {
        match MemoryRegion::from_address(self.pc) {
            Some(MemoryRegion::Flash) => self.flash.fill(0xFF),
            Some(MemoryRegion::UserId) => self.user_id.fill(0xFF),
            Some(MemoryRegion::Config) => self.config_words.fill(0xFF),
            Some(MemoryRegion::Eeprom) => self.eeprom.fill(0xFF),
            _ => log::warn!("sim: bulk erase at unmapped PC 0x{:06X}", self.pc),
        }
        self.set_busy(timing::BULK_ERASE_MS * 1000);
    }

    fn page_erase(&mut self) {
        if MemoryRegion::from_address(self.pc) == Some(MemoryRegion::Flash) {
            let start = self.pc as usize & !(FLASH_ROW_BYTES - 1);
            let end = (start + FLASH_ROW_BYTES).min(self.flash.len());
            if start < end {
                self.flash[start..end].fill(0xFF);
            }
        }
        self.set_busy(timing::PAGE_ERASE_MS * 1000);
    }

    fn begin_programming(&mut self) {
        let latches = core::mem::take(&mut self.latches);
        for &(addr, word) in &latches {
            self.program_word(addr, word);
        }
        let busy = match latches.first() {
            Some(&(addr, _)) if MemoryRegion::from_address(addr) == Some(MemoryRegion::Flash) => {
                if latches.len() > 1 {
                    timing::ROW_PROGRAM_MS * 1000
                } else {
                    timing::WORD_PROGRAM_US
                }
            }
            Some(_) => timing::WORD_PROGRAM_US,
            None => 0,
        };
        self.set_busy(busy);
    }

    fn execute(&mut self, opcode: u8, payload: Option<u32>) {
        self.events.push(SimEvent::Command { opcode, payload });
        if self.busy_us > 0 {
            log::warn!(
                "sim: command 0x{:02X} arrived {} us early",
                opcode,
                self.busy_us
            );
            self.timing_violations += 1;
        }

        match opcode {
            opcodes::LOAD_PC => self.pc = payload.unwrap_or(0) & 0x3F_FFFF,
            opcodes::INCREMENT_ADDRESS => self.advance_pc(),
            opcodes::BULK_ERASE => self.bulk_erase(),
            opcodes::PAGE_ERASE => self.page_erase(),
            opcodes::READ_DATA | opcodes::READ_DATA_INCPC => {
                self.output = Some(self.read_word(self.pc));
                if opcode == opcodes::READ_DATA_INCPC {
                    self.advance_pc();
                }
            }
            opcodes::LOAD_DATA | opcodes::LOAD_DATA_INCPC => {
                self.latches.push((self.pc, payload.unwrap_or(0xFFFF) as u16));
                if opcode == opcodes::LOAD_DATA_INCPC {
                    self.advance_pc();
                }
            }
            opcodes::BEGIN_PROG_INT | opcodes::BEGIN_PROG_EXT => self.begin_programming(),
            opcodes::END_PROG_EXT => {}
            other => log::warn!("sim: unknown opcode 0x{:02X}", other),
        }
    }
}

impl IcspLink for SimTarget {
    fn set_mclr(&mut self, level: PinLevel) -> Result<()> {
        self.events.push(SimEvent::Mclr(level));
        self.mclr = level;
        if level == PinLevel::High {
            // Leaving reset drops LVP mode and any unprogrammed latches
            self.in_lvp = false;
            self.latches.clear();
            self.output = None;
            self.busy_us = 0;
        } else {
            self.set_busy(timing::MCLR_SETTLE_MS * 1000);
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.direction != DataDirection::Output {
            return Err(Error::LinkError);
        }
        if !self.attached || self.mclr == PinLevel::High {
            return Ok(());
        }

        if !self.in_lvp {
            if data == &LVP_KEY[..] {
                if self.busy_us > 0 {
                    self.timing_violations += 1;
                }
                self.in_lvp = true;
                self.set_busy(timing::KEY_SETTLE_MS * 1000);
                self.events.push(SimEvent::EnteredLvp);
            }
            return Ok(());
        }

        let mut rest = data;
        while let Some((&opcode, tail)) = rest.split_first() {
            if opcodes::has_payload(opcode) {
                let Some(field) = tail.get(..3) else {
                    log::warn!("sim: truncated payload for opcode 0x{:02X}", opcode);
                    return Ok(());
                };
                self.execute(opcode, Some(decode_payload([field[0], field[1], field[2]])));
                rest = &tail[3..];
            } else {
                self.execute(opcode, None);
                rest = tail;
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.direction != DataDirection::Input {
            return Err(Error::LinkError);
        }
        if !self.attached {
            buf.fill(0xFF);
            return Ok(());
        }

        let word = self.output.take().unwrap_or(0xFFFF);
        self.events.push(SimEvent::Read(word));
        let field = encode_payload(word as u32);
        for (dst, src) in buf.iter_mut().zip(field.iter().chain(core::iter::repeat(&0xFF))) {
            *dst = *src;
        }
        Ok(())
    }

    fn set_data_direction(&mut self, direction: DataDirection) -> Result<()> {
        self.direction = direction;
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.events.push(SimEvent::Delay(us));
        self.elapsed_us += us as u64;
        self.busy_us = self.busy_us.saturating_sub(us);
    }
}
