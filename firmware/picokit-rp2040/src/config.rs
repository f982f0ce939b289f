// Pin assignments and hardware constants.

use embassy_rp::peripherals;

// =============================================================================
// ICSP pins
// =============================================================================

/// ICSPCLK, driven by the programmer
pub type ClockPin = peripherals::PIN_6;

/// ICSPDAT, bidirectional
pub type DataPin = peripherals::PIN_7;

/// MCLR, idle high (target running)
pub type MclrPin = peripherals::PIN_29;

// =============================================================================
// Host link
// =============================================================================

/// Host UART baud rate (8N1)
pub const HOST_BAUD: u32 = 115_200;

// =============================================================================
// ICSP clock
// =============================================================================

/// Busy-wait cycles per clock half period (~1 us at 125 MHz)
pub const HALF_PERIOD_CYCLES: u32 = 125;
