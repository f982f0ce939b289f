//! In-memory host stream

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_io::{ErrorType, Read, Write};
use picokit_core::dispatch::Programmer;

use crate::target::SimTarget;

/// Byte stream between a host and the programmer.
///
/// Reads drain the bytes queued with [`push`](MemoryStream::push) and
/// report end of stream once the queue is empty; writes are collected and
/// returned by [`take_output`](MemoryStream::take_output).
#[derive(Debug, Default)]
pub struct MemoryStream {
    input: VecDeque<u8>,
    output: Vec<u8>,
    flushes: usize,
}

impl MemoryStream {
    /// Create an empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the programmer to read
    pub fn push(&mut self, data: &[u8]) {
        self.input.extend(data);
    }

    /// Take everything the programmer has written so far
    pub fn take_output(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.output)
    }

    /// Number of bytes not yet read
    pub fn pending(&self) -> usize {
        self.input.len()
    }

    /// Number of flushes seen
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl ErrorType for MemoryStream {
    type Error = Infallible;
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.input.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

/// A complete simulated programmer: dispatcher and target behind a stream
pub struct SimDevice {
    programmer: Programmer<SimTarget>,
    stream: MemoryStream,
}

impl SimDevice {
    /// Create a programmer attached to `target`
    pub fn new(target: SimTarget) -> Self {
        Self {
            programmer: Programmer::new(target),
            stream: MemoryStream::new(),
        }
    }

    /// Feed host bytes, serve every request they contain, and return the
    /// bytes the programmer sent back
    pub fn transact(&mut self, host_bytes: &[u8]) -> Vec<u8> {
        self.stream.push(host_bytes);
        self.programmer.serve(&mut self.stream);
        self.stream.take_output()
    }

    /// Get the simulated target
    pub fn target(&self) -> &SimTarget {
        self.programmer.icsp().link()
    }

    /// Get the simulated target mutably
    pub fn target_mut(&mut self) -> &mut SimTarget {
        self.programmer.icsp_mut().link_mut()
    }

    /// Get the dispatcher
    pub fn programmer(&self) -> &Programmer<SimTarget> {
        &self.programmer
    }
}
