//! Device identification catalog
//!
//! Static table of supported parts. A device ID matches an entry when
//! `(device_id & mask) == (id & mask)`; the first match wins.

/// A catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetInfo {
    /// Device ID (compared under `mask`)
    pub id: u16,
    /// Bits of the device ID that identify the part
    pub mask: u16,
    /// Part name
    pub name: &'static str,
    /// Program flash size in bytes
    pub flash_size: u32,
}

impl TargetInfo {
    const fn new(id: u16, mask: u16, name: &'static str, flash_size: u32) -> Self {
        Self {
            id,
            mask,
            name,
            flash_size,
        }
    }

    /// Check if a device ID belongs to this entry
    pub fn matches(&self, device_id: u16) -> bool {
        (device_id & self.mask) == (self.id & self.mask)
    }
}

/// Name reported for device IDs not in the catalog
pub const UNKNOWN_NAME: &str = "Unknown";

/// Supported parts, searched in order
pub static TARGETS: &[TargetInfo] = &[
    // PIC18F27K42 family, ID upper byte 0x6C
    TargetInfo::new(0x6C20, 0xFF00, "PIC18F27K42", 131072),
    TargetInfo::new(0x6C40, 0xFF00, "PIC18F27K42", 131072),
    TargetInfo::new(0x6C00, 0xFF00, "PIC18F26K42", 65536),
    TargetInfo::new(0x6CE0, 0xFF00, "PIC18F25K42", 32768),
    TargetInfo::new(0x6CC0, 0xFF00, "PIC18F24K42", 16384),
    TargetInfo::new(0x6CA0, 0xFF00, "PIC18F47K42", 131072),
    TargetInfo::new(0x6C80, 0xFF00, "PIC18F46K42", 65536),
    TargetInfo::new(0x6C60, 0xFF00, "PIC18F45K42", 32768),
    // Q41 family
    TargetInfo::new(0x74E0, 0xFFE0, "PIC18F15Q41", 32768),
    TargetInfo::new(0x7500, 0xFFE0, "PIC18F05Q41", 16384),
    TargetInfo::new(0x7520, 0xFFE0, "PIC18F14Q41", 16384),
    TargetInfo::new(0x7540, 0xFFE0, "PIC18F04Q41", 8192),
    TargetInfo::new(0x7560, 0xFFE0, "PIC18F16Q41", 65536),
    TargetInfo::new(0x7580, 0xFFE0, "PIC18F06Q41", 32768),
    // Q40 family
    TargetInfo::new(0x75A0, 0xFFE0, "PIC16F16Q40", 16384),
    TargetInfo::new(0x75C0, 0xFFE0, "PIC18F06Q40", 32768),
    TargetInfo::new(0x75E0, 0xFFE0, "PIC18F15Q40", 32768),
    TargetInfo::new(0x7600, 0xFFE0, "PIC18F05Q40", 16384),
    TargetInfo::new(0x7620, 0xFFE0, "PIC18F14Q40", 16384),
    TargetInfo::new(0x7640, 0xFFE0, "PIC18F04Q40", 8192),
];

/// Find the first catalog entry matching a device ID
pub fn find(device_id: u16) -> Option<&'static TargetInfo> {
    TARGETS.iter().find(|t| t.matches(device_id))
}

/// Part name for a device ID, or [`UNKNOWN_NAME`]
pub fn identify(device_id: u16) -> &'static str {
    find(device_id).map_or(UNKNOWN_NAME, |t| t.name)
}

/// Flash size for a device ID, or 0 if unknown
pub fn flash_size(device_id: u16) -> u32 {
    find(device_id).map_or(0, |t| t.flash_size)
}
