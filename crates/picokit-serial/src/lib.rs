//! picokit-serial - Host-side client for the picokit programmer
//!
//! This crate talks to a picokit programmer over a serial port using the
//! CRC-8 protected frame protocol defined in `picokit-core`.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! let mut picokit = picokit_serial::open_serial("/dev/ttyACM0", 115200, Duration::from_secs(30))?;
//! println!("Firmware: {}", picokit.version()?);
//!
//! let info = picokit.diag()?;
//! println!("Target: {} rev {}", info.name, info.revision());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod error;
pub mod transport;

use std::time::Duration;

// Re-exports
pub use device::{DeviceInfo, Picokit, DEFAULT_RETRIES, EEPROM_CHUNK, READ_CHUNK};
pub use error::{PicokitError, Result};
pub use transport::serial::{SerialTransport, DEFAULT_BAUD};
pub use transport::Transport;

/// Open a picokit programmer on a serial port
pub fn open_serial(device: &str, baud: u32, timeout: Duration) -> Result<Picokit<SerialTransport>> {
    let mut transport = SerialTransport::open(device, baud, timeout)?;
    // Drop anything left over from a previous session
    transport.clear_input()?;
    Ok(Picokit::new(transport))
}
