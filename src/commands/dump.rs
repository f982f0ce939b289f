//! Dump command implementation

use std::fs;
use std::path::Path;

use picokit_serial::{Picokit, Transport};

use super::{byte_progress, CmdResult};
use crate::cli::DumpFormat;
use crate::hex;

/// Read `size` bytes from `start` and save them in `format`
pub fn run_dump<T: Transport>(
    picokit: &mut Picokit<T>,
    file: &Path,
    start: u32,
    size: u32,
    format: DumpFormat,
) -> CmdResult {
    println!("Reading {} bytes from 0x{:06X}...", size, start);
    let data = read_memory(picokit, start, size as usize)?;

    let contents = match format {
        DumpFormat::Hex => hex::to_ihex(start, &data)?.into_bytes(),
        DumpFormat::Bin => data,
    };
    fs::write(file, contents)?;

    println!("Saved to {}", file.display());
    Ok(())
}

/// Read a memory range with a progress bar, then reset the target
pub fn read_memory<T: Transport>(
    picokit: &mut Picokit<T>,
    start: u32,
    size: usize,
) -> CmdResult<Vec<u8>> {
    let pb = byte_progress(size)?;
    let data = picokit.read_range(start, size, |n| pb.set_position(n as u64))?;
    pb.finish_with_message("Read complete");

    picokit.reset_target()?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{sim, target};
    use crate::hex::HexImage;
    use picokit_sim::SimTarget;

    #[test]
    fn test_read_memory_spans_chunks() {
        let mut fresh = SimTarget::new_default();
        fresh.flash_mut()[0x100..0x200].fill(0x5A);
        let mut picokit = sim(fresh);

        let data = read_memory(&mut picokit, 0x80, 0x200).unwrap();
        assert_eq!(data.len(), 0x200);
        assert!(data[..0x80].iter().all(|&b| b == 0xFF));
        assert!(data[0x80..0x180].iter().all(|&b| b == 0x5A));
        assert!(!target(&mut picokit).in_lvp());
    }

    #[test]
    fn test_dump_hex_file() {
        let mut fresh = SimTarget::new_default();
        fresh.flash_mut()[..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let mut picokit = sim(fresh);

        let path = std::env::temp_dir().join(format!("picokit-dump-{}.hex", std::process::id()));
        run_dump(&mut picokit, &path, 0, 256, DumpFormat::Hex).unwrap();
        let image = HexImage::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(image.len(), 256);
        assert_eq!(image.get(1), Some(0xAD));
        assert_eq!(image.get(255), Some(0xFF));
    }
}
