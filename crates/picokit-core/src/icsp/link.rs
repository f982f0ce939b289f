//! Physical link trait
//!
//! The link is the only piece of the engine that touches hardware. It
//! provides the MCLR (reset) pin, a clocked serial data line and a blocking
//! delay. Firmware implements it on top of GPIO; tests implement it with a
//! simulated target.

use crate::error::Result;

/// Logic level driven on a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    /// Driven low
    Low,
    /// Driven high
    High,
}

/// Direction of the ICSP data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    /// Programmer drives the data line
    Output,
    /// Target drives the data line
    Input,
}

/// Physical ICSP link
///
/// Bytes are clocked MSB first. Implementations must emit the whole slice
/// passed to [`write`](IcspLink::write) back to back: the target latches a
/// command within a few clock periods, so a preemption between two bytes of
/// one command can corrupt it. Firmware implementations should mask
/// interrupts for the duration of a transfer.
pub trait IcspLink {
    /// Drive the MCLR (reset) pin
    fn set_mclr(&mut self, level: PinLevel) -> Result<()>;

    /// Clock bytes out on the data line
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Clock bytes in from the data line
    ///
    /// The data line has been switched to [`DataDirection::Input`] before
    /// this is called.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Switch the direction of the data line
    fn set_data_direction(&mut self, direction: DataDirection) -> Result<()>;

    /// Whether the link can read back from the target at all
    ///
    /// Write-only wiring returns false, in which case reads yield `0xFFFF`
    /// without touching the bus.
    fn has_data_in(&self) -> bool {
        true
    }

    /// Block for at least `us` microseconds
    fn delay_us(&mut self, us: u32);

    /// Block for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

impl<L: IcspLink + ?Sized> IcspLink for &mut L {
    fn set_mclr(&mut self, level: PinLevel) -> Result<()> {
        (**self).set_mclr(level)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn set_data_direction(&mut self, direction: DataDirection) -> Result<()> {
        (**self).set_data_direction(direction)
    }

    fn has_data_in(&self) -> bool {
        (**self).has_data_in()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
