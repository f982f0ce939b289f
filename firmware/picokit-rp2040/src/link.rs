//! Bit-banged ICSP link on RP2040 GPIO
//!
//! Bytes are clocked MSB first. The programmer changes ICSPDAT while
//! ICSPCLK is high and the target latches it on the falling edge; on reads
//! the target drives ICSPDAT after the rising edge and the programmer
//! samples it after the falling edge.

use embassy_rp::gpio::{Flex, Level, Output, Pull};
use embassy_rp::Peri;
use embassy_time::{block_for, Duration};
use picokit_core::icsp::{DataDirection, IcspLink, PinLevel};
use picokit_core::Result;

use crate::config::{ClockPin, DataPin, MclrPin, HALF_PERIOD_CYCLES};

/// ICSP pins of the programmer
pub struct GpioLink {
    clk: Output<'static>,
    dat: Flex<'static>,
    mclr: Output<'static>,
}

impl GpioLink {
    /// Take the ICSP pins, leaving the target running
    pub fn new(
        clk: Peri<'static, ClockPin>,
        dat: Peri<'static, DataPin>,
        mclr: Peri<'static, MclrPin>,
    ) -> Self {
        let clk = Output::new(clk, Level::Low);

        let mut dat = Flex::new(dat);
        dat.set_pull(Pull::Up);
        dat.set_low();
        dat.set_as_output();

        let mclr = Output::new(mclr, Level::High);

        Self { clk, dat, mclr }
    }

    #[inline(always)]
    fn half_period() {
        cortex_m::asm::delay(HALF_PERIOD_CYCLES);
    }

    fn write_byte(&mut self, byte: u8) {
        for bit in (0..8).rev() {
            self.clk.set_high();
            if byte & (1 << bit) != 0 {
                self.dat.set_high();
            } else {
                self.dat.set_low();
            }
            Self::half_period();
            self.clk.set_low();
            Self::half_period();
        }
    }

    fn read_byte(&mut self) -> u8 {
        let mut byte = 0u8;
        for _ in 0..8 {
            self.clk.set_high();
            Self::half_period();
            self.clk.set_low();
            Self::half_period();
            byte = (byte << 1) | self.dat.is_high() as u8;
        }
        byte
    }
}

impl IcspLink for GpioLink {
    fn set_mclr(&mut self, level: PinLevel) -> Result<()> {
        match level {
            PinLevel::Low => self.mclr.set_low(),
            PinLevel::High => self.mclr.set_high(),
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        // A command must not be split by an interrupt
        critical_section::with(|_| {
            for &byte in data {
                self.write_byte(byte);
            }
        });
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        critical_section::with(|_| {
            for byte in buf.iter_mut() {
                *byte = self.read_byte();
            }
        });
        Ok(())
    }

    fn set_data_direction(&mut self, direction: DataDirection) -> Result<()> {
        match direction {
            DataDirection::Output => self.dat.set_as_output(),
            DataDirection::Input => self.dat.set_as_input(),
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        block_for(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        block_for(Duration::from_millis(ms as u64));
    }
}
