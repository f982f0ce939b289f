//! Configuration word decoding

use picokit_core::target::CONFIG_START;
use picokit_serial::{Picokit, Transport};

use super::CmdResult;

/// Size of the configuration block
const CONFIG_BYTES: usize = 16;

/// One configuration register as printed
#[derive(Debug, PartialEq, Eq)]
pub struct ConfigRow {
    pub name: String,
    pub addr: u32,
    pub value: u8,
    pub description: String,
}

fn fextosc(v: u8) -> &'static str {
    match v & 7 {
        7 => "ECH",
        6 => "ECM",
        5 => "ECL",
        4 => "OFF",
        2 => "HS",
        1 => "XT",
        0 => "LP",
        _ => "Reserved",
    }
}

fn rstosc(v: u8) -> &'static str {
    match (v >> 4) & 7 {
        7 => "EXTOSC",
        6 => "HFINTOSC 1MHz",
        5 => "LFINTOSC",
        4 => "SOSC",
        2 => "EXTOSC+4xPLL",
        0 => "HFINTOSC 64MHz",
        _ => "Reserved",
    }
}

fn wdt(v: u8) -> &'static str {
    match (v >> 4) & 3 {
        3 => "Enabled",
        2 => "Sleep-disabled",
        1 => "SWDTEN",
        _ => "Disabled",
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Decode the configuration block into CONFIGnL/CONFIGnH rows
pub fn decode(config: &[u8; CONFIG_BYTES]) -> Vec<ConfigRow> {
    let mut rows = Vec::with_capacity(CONFIG_BYTES);
    for (i, pair) in config.chunks_exact(2).enumerate() {
        let (lo, hi) = (pair[0], pair[1]);
        let (desc_lo, desc_hi) = match i {
            0 => (
                format!("FEXTOSC={} RSTOSC={}", fextosc(lo), rstosc(lo)),
                format!("CLKDIV={}", hi & 0x0F),
            ),
            1 => (format!("MCLR={}", on_off(lo & 0x80 != 0)), String::new()),
            2 => (format!("WDT={}", wdt(lo)), String::new()),
            3 => (
                format!(
                    "LVP={} DEBUG={}",
                    on_off(lo & 0x20 != 0),
                    on_off(lo & 0x80 == 0)
                ),
                String::new(),
            ),
            4 => (format!("CP={}", on_off(lo & 0x01 == 0)), String::new()),
            _ => (String::new(), String::new()),
        };

        let addr = CONFIG_START + 2 * i as u32;
        rows.push(ConfigRow {
            name: format!("CONFIG{}L", i + 1),
            addr,
            value: lo,
            description: desc_lo,
        });
        rows.push(ConfigRow {
            name: format!("CONFIG{}H", i + 1),
            addr: addr + 1,
            value: hi,
            description: desc_hi,
        });
    }
    rows
}

/// Read the configuration block, reset the target and print the table
pub fn run_config<T: Transport>(picokit: &mut Picokit<T>) -> CmdResult {
    let data = picokit.read(CONFIG_START, CONFIG_BYTES)?;
    picokit.reset_target()?;

    let mut config = [0u8; CONFIG_BYTES];
    config.copy_from_slice(&data);

    let rule = "-".repeat(72);
    println!("{}", rule);
    println!("{:<12} {:<8} {:<6} Description", "Register", "Addr", "Value");
    println!("{}", rule);
    for row in decode(&config) {
        println!(
            "{:<12} {:06X}   0x{:02X}   {}",
            row.name, row.addr, row.value, row.description
        );
    }
    println!("{}", rule);
    Ok(())
}
