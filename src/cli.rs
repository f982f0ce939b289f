//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "picokit")]
#[command(author, version, about = "PIC18 ICSP programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Serial port of the programmer
    #[arg(short, long, global = true, default_value = "/dev/ttyACM0")]
    pub port: String,

    /// Baud rate
    #[arg(short, long, global = true, default_value_t = 115200)]
    pub baud: u32,

    /// Response timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Attempts per request before giving up
    #[arg(long, global = true, default_value_t = 3)]
    pub retries: u32,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for dumps
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DumpFormat {
    /// Intel HEX
    Hex,
    /// Raw binary
    Bin,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the programmer firmware version
    Version,

    /// Identify the attached target
    Diag,

    /// Bulk erase the target
    Wipe,

    /// Erase the target and program an Intel HEX file
    Write {
        /// Intel HEX file
        file: PathBuf,
    },

    /// Compare target memory against an Intel HEX file
    Verify {
        /// Intel HEX file
        file: PathBuf,
    },

    /// Read target memory to a file
    Dump {
        /// Output file
        file: PathBuf,

        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "131072")]
        size: u32,

        /// Output format
        #[arg(long, value_enum, default_value_t = DumpFormat::Hex)]
        format: DumpFormat,
    },

    /// Read and decode the configuration words
    Config,

    /// Run the data EEPROM self-test
    TestEeprom,

    /// Release the target from programming mode
    Reset,
}
