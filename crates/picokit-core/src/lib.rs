//! picokit-core - Core library for the picokit PIC18 ICSP programmer
//!
//! This crate contains everything the programmer firmware needs between the
//! host byte stream and the target's programming pins. It is `no_std`
//! compatible so the same code runs on the microcontroller and in host-side
//! tests against a simulated target.
//!
//! # Layers
//!
//! - [`protocol`] - CRC-8 protected request/response frames exchanged with the host
//! - [`dispatch`] - maps each host command onto an ICSP sequence
//! - [`icsp`] - the low-voltage-programming engine and its bit-level command encoding
//! - [`target`] - the PIC18 memory map and the device identification catalog
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation
//!
//! # Example
//!
//! ```ignore
//! use picokit_core::dispatch::Programmer;
//! use picokit_core::icsp::IcspLink;
//!
//! fn run<L: IcspLink, T: embedded_io::Read + embedded_io::Write>(link: L, host: &mut T) -> ! {
//!     let mut programmer = Programmer::new(link);
//!     loop {
//!         // Frame errors are already logged; just wait for the next request
//!         let _ = programmer.process(host);
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod dispatch;
pub mod error;
pub mod icsp;
pub mod protocol;
pub mod target;

pub use error::{Error, Result};
