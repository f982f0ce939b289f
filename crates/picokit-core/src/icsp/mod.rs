//! ICSP low-voltage programming engine
//!
//! The engine drives a PIC18 target through its In-Circuit Serial
//! Programming interface. Entry into low-voltage programming (LVP) mode is
//! modelled as a capability: [`Icsp::enter_lvp`] hands out an
//! [`LvpSession`], and every programming primitive is a method on that
//! session. Code that has not entered LVP mode has no way to clock a
//! programming command out to the target.

mod engine;
mod link;
pub mod opcodes;
pub mod timing;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{decode_payload, encode_command, encode_payload, EraseRegions, Icsp, LvpSession};
pub use link::{DataDirection, IcspLink, PinLevel};

/// Unlock key clocked out after MCLR is pulled low to enter LVP mode
pub const LVP_KEY: [u8; 4] = *b"MCHP";
