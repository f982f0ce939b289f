//! Minimum delays for PIC18 K42 low-voltage programming
//!
//! These are datasheet safety margins. Shortening any of them can leave an
//! erase or program cycle incomplete without the target reporting it.

/// MCLR low to first key bit, lets supply and signals settle
pub const MCLR_SETTLE_MS: u32 = 50;
/// After the LVP key, before the first command
pub const KEY_SETTLE_MS: u32 = 5;
/// After MCLR is released on LVP exit
pub const LVP_EXIT_MS: u32 = 5;
/// Full bulk erase cycle of one region
pub const BULK_ERASE_MS: u32 = 26;
/// Flash row erase
pub const PAGE_ERASE_MS: u32 = 11;
/// Self-timed programming pulse of a single latched word
pub const WORD_PROGRAM_US: u32 = 75;
/// Self-timed programming pulse of a full flash row
pub const ROW_PROGRAM_MS: u32 = 3;
/// EEPROM byte write commit time
pub const EEPROM_WRITE_MS: u32 = 11;
/// Configuration word write commit time
pub const CONFIG_WRITE_MS: u32 = 11;
/// LOAD_PC to READ_DATA setup time for the ID words
pub const ID_READ_SETUP_US: u32 = 1;
/// Hold time after releasing the target from programming mode
pub const RESET_HOLD_MS: u32 = 10;
/// Pause between leaving and re-entering LVP during the EEPROM self-test
pub const SELF_TEST_COOLDOWN_MS: u32 = 10;
