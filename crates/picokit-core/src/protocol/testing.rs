//! In-memory byte stream for protocol tests

use embedded_io::{ErrorType, Read, Write};

/// Duplex stream: reads come from `input`, writes are appended to `output`
pub struct Pipe<'a> {
    input: &'a [u8],
    pub output: heapless::Vec<u8, 1024>,
}

impl<'a> Pipe<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            output: heapless::Vec::new(),
        }
    }
}

impl ErrorType for Pipe<'_> {
    type Error = core::convert::Infallible;
}

impl Read for Pipe<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.input.len());
        buf[..n].copy_from_slice(&self.input[..n]);
        self.input = &self.input[n..];
        Ok(n)
    }
}

impl Write for Pipe<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.output.capacity() - self.output.len());
        self.output.extend_from_slice(&buf[..n]).ok();
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
