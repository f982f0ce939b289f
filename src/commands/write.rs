//! Write command implementation

use std::io::Write;
use std::path::Path;

use picokit_serial::{Picokit, Transport, EEPROM_CHUNK};

use super::{item_progress, CmdResult};
use crate::hex::{HexImage, ProgramPlan};

/// Erase the target and program an Intel HEX file
pub fn run_write<T: Transport>(picokit: &mut Picokit<T>, file: &Path) -> CmdResult {
    let image = HexImage::load(file)?;
    log::info!("Loaded {} bytes from {}", image.len(), file.display());
    write_image(picokit, &image)
}

/// Program an image: erase, flash rows, config, EEPROM, then reset
pub fn write_image<T: Transport>(picokit: &mut Picokit<T>, image: &HexImage) -> CmdResult {
    let ProgramPlan {
        pages,
        config,
        eeprom,
        skipped,
    } = image.plan();
    if let Some(first) = skipped.first() {
        log::warn!(
            "Skipping {} bytes outside writable memory (first at 0x{:06X})",
            skipped.len(),
            first
        );
    }

    let info = picokit.diag()?;
    println!("Target: {} (0x{:04X})", info.name, info.device_id);

    print!("Erasing...");
    std::io::stdout().flush()?;
    picokit.erase()?;
    println!(" done.");

    if !pages.is_empty() {
        println!("Writing {} flash pages...", pages.len());
        let pb = item_progress(pages.len(), "pages")?;
        for page in &pages {
            log::debug!("Writing page at 0x{:06X}", page.addr);
            picokit.write_page(page.addr, &page.data)?;
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    if let Some(config) = config {
        print!("Writing config words...");
        std::io::stdout().flush()?;
        picokit.write_config(config.addr, &config.data)?;
        println!(" done.");
    }

    if let Some(eeprom) = eeprom {
        println!("Writing EEPROM ({} bytes)...", eeprom.data.len());
        let chunks = eeprom.data.chunks(EEPROM_CHUNK);
        let pb = item_progress(chunks.len(), "chunks")?;
        for (i, chunk) in chunks.enumerate() {
            picokit.write_eeprom(eeprom.addr + (i * EEPROM_CHUNK) as u32, chunk)?;
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    picokit.reset_target()?;
    println!("Write complete.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{sim, target};
    use picokit_core::target::{CONFIG_START, EEPROM_START};
    use picokit_sim::SimTarget;

    #[test]
    fn test_write_image_programs_all_regions() {
        let mut image = HexImage::new();
        image.insert(0x0000, &[0x12, 0x34, 0x56]).unwrap();
        image.insert(0x1F00, &[0xAB; 200]).unwrap();
        image.insert(CONFIG_START, &[0xEC, 0xFF]).unwrap();
        image.insert(CONFIG_START + 6, &[0xDF]).unwrap();
        image.insert(EEPROM_START + 2, &[0x42; 130]).unwrap();

        let mut fresh = SimTarget::new_default();
        fresh.flash_mut()[0x4000] = 0x00;
        let mut picokit = sim(fresh);
        write_image(&mut picokit, &image).unwrap();

        let target = target(&mut picokit);
        assert_eq!(target.flash()[..4], [0x12, 0x34, 0x56, 0xFF]);
        assert!(target.flash()[0x1F00..0x1FC8].iter().all(|&b| b == 0xAB));
        assert_eq!(target.flash()[0x1FC8], 0xFF);
        // Erased before programming
        assert_eq!(target.flash()[0x4000], 0xFF);
        assert_eq!(target.config_bytes()[..2], [0xEC, 0xFF]);
        assert_eq!(target.config_bytes()[6], 0xDF);
        assert_eq!(target.eeprom()[1], 0xFF);
        assert!(target.eeprom()[2..132].iter().all(|&b| b == 0x42));
        assert!(!target.in_lvp());
        assert_eq!(target.timing_violations(), 0);
    }

    #[test]
    fn test_write_image_skips_unwritable_bytes() {
        let mut image = HexImage::new();
        image.insert(0x0000, &[0x5A]).unwrap();
        image.insert(CONFIG_START + 0x10, &[0x00; 4]).unwrap();

        let mut picokit = sim(SimTarget::new_default());
        write_image(&mut picokit, &image).unwrap();

        let target = target(&mut picokit);
        assert_eq!(target.flash()[0], 0x5A);
        assert_eq!(target.flash()[1], 0xFF);
        assert!(target.config_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_write_without_target_fails() {
        let mut image = HexImage::new();
        image.insert(0, &[0x00]).unwrap();
        let mut picokit = sim(SimTarget::detached());
        assert!(write_image(&mut picokit, &image).is_err());
    }
}
