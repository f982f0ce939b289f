//! picokit programmer firmware for Raspberry Pi Pico
//!
//! Receives CRC-8 framed requests from the host over UART0 and programs a
//! PIC18 target through a bit-banged low-voltage ICSP link.
//!
//! ## Pin Assignments
//!
//! | Pin   | Function              |
//! |-------|-----------------------|
//! | GP0   | UART0 TX (to host)    |
//! | GP1   | UART0 RX (from host)  |
//! | GP6   | ICSPCLK               |
//! | GP7   | ICSPDAT               |
//! | GP29  | MCLR                  |
//! | GP25  | Activity LED          |

#![no_std]
#![no_main]

mod config;
mod host;
mod link;

use defmt::{info, warn, Display2Format};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::uart::{Config as UartConfig, Uart};
use picokit_core::dispatch::Programmer;
use picokit_core::protocol::{read_request, send_response, VERSION_STRING};
use {defmt_rtt as _, panic_probe as _};

use crate::config::HOST_BAUD;
use crate::host::HostPort;
use crate::link::GpioLink;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("{} starting...", VERSION_STRING);

    let p = embassy_rp::init(Default::default());

    // Target is left running until the first programming request
    let link = GpioLink::new(p.PIN_6, p.PIN_7, p.PIN_29);
    let mut led = Output::new(p.PIN_25, Level::Low);

    let mut uart_config = UartConfig::default();
    uart_config.baudrate = HOST_BAUD;
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let mut host = HostPort::new(uart);

    let mut programmer = Programmer::new(link);
    info!("{} ready", VERSION_STRING);

    loop {
        let request = match read_request(&mut host) {
            Ok(request) => request,
            Err(e) => {
                warn!("Dropped frame: {}", Display2Format(&e));
                continue;
            }
        };

        led.set_high();
        let response = programmer.execute(&request);
        if let Err(e) = send_response(&mut host, response.status, &response.payload) {
            warn!("Failed to send response: {}", Display2Format(&e));
        }
        led.set_low();
    }
}
