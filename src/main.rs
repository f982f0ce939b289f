//! picokit - Host tool for the picokit PIC18 programmer
//!
//! Talks to an RP2040 running the picokit firmware over a serial port and
//! programs PIC18 targets through it using low-voltage ICSP.
//!
//! # Architecture
//!
//! - `picokit-core` holds the frame protocol, the ICSP engine and the
//!   command dispatcher shared with the firmware
//! - `picokit-serial` wraps each protocol command in a typed call
//! - this binary parses Intel HEX files and drives the programmer

mod cli;
mod commands;
mod hex;

use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands};
use picokit_serial::{Picokit, SerialTransport};

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn open(cli: &Cli) -> Result<Picokit<SerialTransport>, Box<dyn std::error::Error>> {
    let picokit = picokit_serial::open_serial(
        &cli.port,
        cli.baud,
        Duration::from_secs(cli.timeout),
    )
    .map_err(|e| format!("Failed to open {}: {}", cli.port, e))?;
    Ok(picokit.with_retries(cli.retries))
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut picokit = open(&cli)?;

    match cli.command {
        Commands::Version => commands::info::run_version(&mut picokit),
        Commands::Diag => commands::info::run_diag(&mut picokit).map(|_| ()),
        Commands::Wipe => commands::info::run_wipe(&mut picokit),
        Commands::Write { file } => commands::write::run_write(&mut picokit, &file),
        Commands::Verify { file } => commands::verify::run_verify(&mut picokit, &file),
        Commands::Dump {
            file,
            start,
            size,
            format,
        } => commands::dump::run_dump(&mut picokit, &file, start, size, format),
        Commands::Config => commands::config::run_config(&mut picokit),
        Commands::TestEeprom => commands::info::run_test_eeprom(&mut picokit),
        Commands::Reset => commands::info::run_reset(&mut picokit),
    }
}
