//! Single-request commands

use std::io::Write;

use picokit_serial::{DeviceInfo, Picokit, Transport};

use super::CmdResult;

/// Print the programmer firmware version
pub fn run_version<T: Transport>(picokit: &mut Picokit<T>) -> CmdResult {
    println!("Firmware: {}", picokit.version()?);
    Ok(())
}

/// Identify the target and print its IDs
pub fn run_diag<T: Transport>(picokit: &mut Picokit<T>) -> CmdResult<DeviceInfo> {
    let info = picokit.diag()?;
    println!("Device:   {}", info.name);
    println!("ID:       0x{:04X}", info.device_id);
    println!("Revision: {} (0x{:04X})", info.revision(), info.revision_id);
    Ok(info)
}

/// Bulk erase the whole target
pub fn run_wipe<T: Transport>(picokit: &mut Picokit<T>) -> CmdResult {
    print!("Erasing all memory...");
    std::io::stdout().flush()?;
    picokit.erase()?;
    println!(" done.");
    Ok(())
}

/// Run the EEPROM self-test; fails the command when the test fails
pub fn run_test_eeprom<T: Transport>(picokit: &mut Picokit<T>) -> CmdResult {
    print!("Running EEPROM test...");
    std::io::stdout().flush()?;
    if picokit.test_eeprom()? {
        println!(" PASS");
        Ok(())
    } else {
        println!(" FAIL");
        Err("EEPROM self-test failed".into())
    }
}

/// Release the target from programming mode
pub fn run_reset<T: Transport>(picokit: &mut Picokit<T>) -> CmdResult {
    picokit.reset_target()?;
    println!("Target reset.");
    Ok(())
}
