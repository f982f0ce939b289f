//! Host byte stream over UART0

use embassy_rp::uart::{self, Blocking, Uart};
use embedded_io::{ErrorKind, ErrorType, Read, Write};

/// UART receive or transmit fault
#[derive(Debug)]
pub struct UartFault(pub uart::Error);

impl embedded_io::Error for UartFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Blocking UART as an `embedded-io` stream
pub struct HostPort {
    uart: Uart<'static, Blocking>,
}

impl HostPort {
    pub fn new(uart: Uart<'static, Blocking>) -> Self {
        Self { uart }
    }
}

impl ErrorType for HostPort {
    type Error = UartFault;
}

impl Read for HostPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        // Block until the whole buffer is filled
        self.uart.blocking_read(buf).map_err(UartFault)?;
        Ok(buf.len())
    }
}

impl Write for HostPort {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.blocking_write(buf).map_err(UartFault)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.blocking_flush().map_err(UartFault)
    }
}
