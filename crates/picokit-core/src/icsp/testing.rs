//! Recording link for unit tests

use super::engine::decode_payload;
use super::link::{DataDirection, IcspLink, PinLevel};
use super::{opcodes, LVP_KEY};
use crate::error::{Error, Result};

/// One observable link operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Mclr(PinLevel),
    Write(heapless::Vec<u8, 8>),
    Read(usize),
    Direction(DataDirection),
    DelayUs(u32),
}

/// Link that records every operation and answers reads from a queue
pub struct RecordingLink {
    events: heapless::Vec<LinkEvent, 1024>,
    reads: heapless::Deque<u8, 256>,
    has_data_in: bool,
    fail_writes: bool,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self {
            events: heapless::Vec::new(),
            reads: heapless::Deque::new(),
            has_data_in: true,
            fail_writes: false,
        }
    }

    pub fn set_has_data_in(&mut self, has_data_in: bool) {
        self.has_data_in = has_data_in;
    }

    /// Make every subsequent write fail with a link error
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Queue bytes returned by subsequent reads; unqueued reads return 0xFF
    pub fn queue_read(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.reads.push_back(b).expect("read queue full");
        }
    }

    pub fn events(&self) -> &heapless::Vec<LinkEvent, 1024> {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Decode written bytes back into (opcode, payload) pairs, skipping the LVP key
    pub fn commands(&self) -> heapless::Vec<(u8, Option<u32>), 512> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LinkEvent::Write(bytes) if bytes.as_slice() != &LVP_KEY[..] => Some(bytes),
                _ => None,
            })
            .map(|bytes| {
                let opcode = bytes[0];
                if opcodes::has_payload(opcode) && bytes.len() == 4 {
                    (opcode, Some(decode_payload([bytes[1], bytes[2], bytes[3]])))
                } else {
                    (opcode, None)
                }
            })
            .collect()
    }

    fn record(&mut self, event: LinkEvent) {
        self.events.push(event).expect("event log full");
    }
}

impl IcspLink for RecordingLink {
    fn set_mclr(&mut self, level: PinLevel) -> Result<()> {
        self.record(LinkEvent::Mclr(level));
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::LinkError);
        }
        let bytes = heapless::Vec::from_slice(data).expect("write too long");
        self.record(LinkEvent::Write(bytes));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        for b in buf.iter_mut() {
            *b = self.reads.pop_front().unwrap_or(0xFF);
        }
        self.record(LinkEvent::Read(buf.len()));
        Ok(())
    }

    fn set_data_direction(&mut self, direction: DataDirection) -> Result<()> {
        self.record(LinkEvent::Direction(direction));
        Ok(())
    }

    fn has_data_in(&self) -> bool {
        self.has_data_in
    }

    fn delay_us(&mut self, us: u32) {
        self.record(LinkEvent::DelayUs(us));
    }
}
