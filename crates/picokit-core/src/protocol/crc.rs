//! CRC-8 used by the frame protocol
//!
//! Polynomial 0x07, initial value 0x00, MSB first, no reflection, no final XOR
//! (CRC-8/SMBUS).

use crc::{Crc, CRC_8_SMBUS};

/// Frame check algorithm
pub const FRAME_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Compute the CRC-8 of `data`
pub fn crc8(data: &[u8]) -> u8 {
    FRAME_CRC.checksum(data)
}

/// CRC-8 of a frame whose header and payload live in separate buffers
pub fn frame_crc(header: &[u8], payload: &[u8]) -> u8 {
    let mut digest = FRAME_CRC.digest();
    digest.update(header);
    digest.update(payload);
    digest.finalize()
}
