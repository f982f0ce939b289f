//! Verify command implementation

use std::path::Path;

use picokit_serial::{Picokit, Transport};

use super::{byte_progress, CmdResult};
use crate::hex::HexImage;

/// Mismatches printed before the rest are only counted
const MAX_REPORTED: usize = 10;

/// Outcome of comparing target memory against an image
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Bytes compared
    pub checked: usize,
    /// Bytes that differ
    pub mismatches: usize,
}

/// Compare target memory against an Intel HEX file
pub fn run_verify<T: Transport>(picokit: &mut Picokit<T>, file: &Path) -> CmdResult {
    let image = HexImage::load(file)?;
    println!("Verifying against {}...", file.display());

    let report = verify_image(picokit, &image)?;
    if report.mismatches == 0 {
        println!("Verification OK: {} bytes match.", report.checked);
        Ok(())
    } else {
        println!(
            "Verification FAILED: {} mismatches in {} bytes.",
            report.mismatches, report.checked
        );
        Err("Verification failed".into())
    }
}

/// Read back every segment of `image` and compare, then reset the target
pub fn verify_image<T: Transport>(
    picokit: &mut Picokit<T>,
    image: &HexImage,
) -> CmdResult<VerifyReport> {
    let segments = image.segments();
    let total: usize = segments.iter().map(|s| s.data.len()).sum();
    let pb = byte_progress(total)?;
    let mut report = VerifyReport::default();

    for segment in &segments {
        let done = report.checked;
        let actual = picokit.read_range(segment.addr, segment.data.len(), |n| {
            pb.set_position((done + n) as u64)
        })?;

        for (i, (&expected, &read)) in segment.data.iter().zip(&actual).enumerate() {
            if expected != read {
                if report.mismatches < MAX_REPORTED {
                    pb.println(format!(
                        "  Mismatch at 0x{:06X}: expected 0x{:02X}, read 0x{:02X}",
                        segment.addr + i as u32,
                        expected,
                        read
                    ));
                }
                report.mismatches += 1;
            }
        }
        report.checked += segment.data.len();
    }
    pb.finish_and_clear();

    picokit.reset_target()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{sim, target};
    use picokit_core::target::EEPROM_START;
    use picokit_sim::SimTarget;

    fn programmed() -> SimTarget {
        let mut fresh = SimTarget::new_default();
        fresh.flash_mut()[..300].iter_mut().enumerate().for_each(|(i, b)| *b = i as u8);
        fresh.eeprom_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);
        fresh
    }

    #[test]
    fn test_verify_match() {
        let mut image = HexImage::new();
        let data: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        image.insert(0, &data).unwrap();
        image.insert(EEPROM_START, &[1, 2, 3, 4]).unwrap();

        let mut picokit = sim(programmed());
        let report = verify_image(&mut picokit, &image).unwrap();
        assert_eq!(
            report,
            VerifyReport {
                checked: 304,
                mismatches: 0
            }
        );
        assert!(!target(&mut picokit).in_lvp());
    }

    #[test]
    fn test_verify_counts_every_mismatch() {
        let mut image = HexImage::new();
        image.insert(0x200, &[0x00; 20]).unwrap();

        let mut picokit = sim(programmed());
        let report = verify_image(&mut picokit, &image).unwrap();
        assert_eq!(report.checked, 20);
        assert_eq!(report.mismatches, 20);
    }
}
