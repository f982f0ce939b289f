//! CLI command implementations
//!
//! Every command takes an open [`Picokit`](picokit_serial::Picokit) and
//! works over any transport, so the same code runs against the serial port
//! and against the simulator in tests.

pub mod config;
pub mod dump;
pub mod info;
pub mod verify;
pub mod write;

use indicatif::{ProgressBar, ProgressStyle};

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Byte progress bar in the usual style
pub(crate) fn byte_progress(total: usize) -> CmdResult<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Counted progress bar for pages and chunks
pub(crate) fn item_progress(total: usize, what: &str) -> CmdResult<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{eta}})",
                what
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
