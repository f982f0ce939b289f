//! picokit-sim - Simulated PIC18 target for testing
//!
//! This crate provides a PIC18 target that lives in memory and sits behind
//! the ICSP link trait, so the engine and dispatcher can be exercised
//! without hardware. [`SimDevice`] wraps the full firmware pipeline
//! (frame codec, dispatcher, engine, simulated target) behind a byte
//! stream, which is what host-side code talks to in tests.

#![no_std]

extern crate alloc;

mod stream;
mod target;

pub use stream::{MemoryStream, SimDevice};
pub use target::{SimConfig, SimEvent, SimTarget};
