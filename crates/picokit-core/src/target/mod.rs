//! PIC18 target description
//!
//! Memory map of the PIC18 K42/Q4x families as seen through ICSP, and the
//! catalog used to name a part from its device ID.

pub mod catalog;

pub use catalog::{TargetInfo, TARGETS};

/// First program flash address
pub const FLASH_START: u32 = 0x000000;
/// Last program flash address (128 KiB part)
pub const FLASH_END: u32 = 0x01FFFF;
/// Bytes per flash row
pub const FLASH_ROW_BYTES: usize = 128;
/// 16-bit words per flash row
pub const FLASH_ROW_WORDS: usize = FLASH_ROW_BYTES / 2;

/// User ID words (bulk erase selector)
pub const USER_ID_START: u32 = 0x200000;
/// Last user ID address
pub const USER_ID_END: u32 = 0x20000F;

/// First configuration byte
pub const CONFIG_START: u32 = 0x300000;
/// Last configuration byte
pub const CONFIG_END: u32 = 0x30000F;

/// First data EEPROM address
pub const EEPROM_START: u32 = 0x310000;
/// Last data EEPROM address (1 KiB)
pub const EEPROM_END: u32 = 0x3103FF;

/// Revision ID word
pub const REVISION_ID_ADDR: u32 = 0x3FFFFC;
/// Device ID word
pub const DEVICE_ID_ADDR: u32 = 0x3FFFFE;

/// Memory region an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Program flash
    Flash,
    /// User ID words
    UserId,
    /// Configuration words
    Config,
    /// Data EEPROM, byte wide
    Eeprom,
    /// Device and revision ID words
    DeviceId,
}

impl MemoryRegion {
    /// Classify an address, or None if it is not mapped
    pub fn from_address(addr: u32) -> Option<Self> {
        match addr {
            FLASH_START..=FLASH_END => Some(Self::Flash),
            USER_ID_START..=USER_ID_END => Some(Self::UserId),
            CONFIG_START..=CONFIG_END => Some(Self::Config),
            EEPROM_START..=EEPROM_END => Some(Self::Eeprom),
            REVISION_ID_ADDR..=0x3FFFFF => Some(Self::DeviceId),
            _ => None,
        }
    }

    /// Whether each PC step addresses one byte instead of one 16-bit word
    pub fn is_byte_wide(&self) -> bool {
        matches!(self, Self::Eeprom)
    }
}

/// Whether a device ID read indicates a responding target.
///
/// A floating or shorted data line reads as all ones or all zeros.
pub fn is_present(device_id: u16) -> bool {
    device_id != 0x0000 && device_id != 0xFFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_address() {
        assert_eq!(MemoryRegion::from_address(0), Some(MemoryRegion::Flash));
        assert_eq!(MemoryRegion::from_address(0x01FFFF), Some(MemoryRegion::Flash));
        assert_eq!(MemoryRegion::from_address(0x020000), None);
        assert_eq!(MemoryRegion::from_address(0x200004), Some(MemoryRegion::UserId));
        assert_eq!(MemoryRegion::from_address(0x30000F), Some(MemoryRegion::Config));
        assert_eq!(MemoryRegion::from_address(0x310000), Some(MemoryRegion::Eeprom));
        assert_eq!(MemoryRegion::from_address(0x310400), None);
        assert_eq!(MemoryRegion::from_address(DEVICE_ID_ADDR), Some(MemoryRegion::DeviceId));
    }

    #[test]
    fn test_is_present() {
        assert!(!is_present(0x0000));
        assert!(!is_present(0xFFFF));
        assert!(is_present(0x6C20));
    }
}
