//! PIC18 ICSP 8-bit command opcodes
//!
//! Commands carrying a payload are followed by three bytes holding the
//! payload in bits 1..=22 of a 24-bit field (see [`super::encode_payload`]).

// ============================================================================
// Addressing
// ============================================================================

/// Load PC address (payload: 22-bit address)
pub const LOAD_PC: u8 = 0x80;
/// Increment address
pub const INCREMENT_ADDRESS: u8 = 0xF8;

// ============================================================================
// Erase
// ============================================================================

/// Bulk erase the memory region selected by PC (no payload)
pub const BULK_ERASE: u8 = 0x18;
/// Erase the flash row addressed by PC (no payload)
pub const PAGE_ERASE: u8 = 0xF0;

// ============================================================================
// Data transfer
// ============================================================================

/// Read NVM data at PC
pub const READ_DATA: u8 = 0xFC;
/// Read NVM data at PC, then increment PC
pub const READ_DATA_INCPC: u8 = 0xFE;
/// Load data latch at PC (payload: 16-bit word)
pub const LOAD_DATA: u8 = 0x00;
/// Load data latch at PC, then increment PC (payload: 16-bit word)
pub const LOAD_DATA_INCPC: u8 = 0x02;

// ============================================================================
// Programming
// ============================================================================

/// Begin internally timed programming
pub const BEGIN_PROG_INT: u8 = 0xE0;
/// Begin externally timed programming
pub const BEGIN_PROG_EXT: u8 = 0xC0;
/// End externally timed programming
pub const END_PROG_EXT: u8 = 0x82;

/// Returns true if the opcode is followed by a 3-byte payload field
pub const fn has_payload(opcode: u8) -> bool {
    matches!(opcode, LOAD_PC | LOAD_DATA | LOAD_DATA_INCPC)
}
