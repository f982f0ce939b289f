//! Intel HEX images
//!
//! A HEX file is loaded into a sparse address to byte map. Writing splits
//! the map into flash rows, the configuration block and data EEPROM, the
//! way the programmer expects them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ihex::Record;
use picokit_core::target::{MemoryRegion, FLASH_ROW_BYTES};

/// Data bytes per record when writing HEX files
const RECORD_BYTES: usize = 16;

/// Sparse memory image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexImage {
    bytes: BTreeMap<u32, u8>,
}

/// A byte block starting at `addr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub addr: u32,
    pub data: Vec<u8>,
}

/// Image split into what each programmer command writes
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProgramPlan {
    /// Full flash rows, unused bytes set to 0xFF
    pub pages: Vec<Block>,
    /// Configuration bytes from the lowest to the highest address present
    pub config: Option<Block>,
    /// EEPROM bytes from the lowest to the highest address present
    pub eeprom: Option<Block>,
    /// Bytes outside every writable region, left out of the plan
    pub skipped: Vec<u32>,
}

impl HexImage {
    /// Create an empty image
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse Intel HEX text
    pub fn parse(text: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut image = Self::new();
        let mut base = 0u32;

        for record in ihex::Reader::new(text) {
            match record? {
                Record::Data { offset, value } => {
                    image.insert(base + offset as u32, &value)?;
                }
                Record::ExtendedSegmentAddress(segment) => base = (segment as u32) * 16,
                Record::ExtendedLinearAddress(upper) => base = (upper as u32) << 16,
                Record::EndOfFile => break,
                Record::StartSegmentAddress { .. } | Record::StartLinearAddress(_) => {}
            }
        }

        Ok(image)
    }

    /// Load an Intel HEX file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&text)
    }

    /// Store `data` starting at `addr`, replacing earlier bytes
    pub fn insert(&mut self, addr: u32, data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        for (i, &b) in data.iter().enumerate() {
            let at = u32::try_from(i)
                .ok()
                .and_then(|i| addr.checked_add(i))
                .ok_or_else(|| format!("data at 0x{:08X} runs past the address space", addr))?;
            self.bytes.insert(at, b);
        }
        Ok(())
    }

    /// Byte at `addr`, if present
    pub fn get(&self, addr: u32) -> Option<u8> {
        self.bytes.get(&addr).copied()
    }

    /// Number of bytes present
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Runs of consecutive addresses, in ascending order
    pub fn segments(&self) -> Vec<Block> {
        let mut segments: Vec<Block> = Vec::new();
        for (&addr, &b) in &self.bytes {
            match segments.last_mut() {
                Some(seg) if seg.addr + seg.data.len() as u32 == addr => seg.data.push(b),
                _ => segments.push(Block {
                    addr,
                    data: vec![b],
                }),
            }
        }
        segments
    }

    /// Group the image into flash rows, config and EEPROM blocks
    pub fn plan(&self) -> ProgramPlan {
        let mut pages: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
        let mut config = BTreeMap::new();
        let mut eeprom = BTreeMap::new();
        let mut skipped = Vec::new();

        for (&addr, &b) in &self.bytes {
            match MemoryRegion::from_address(addr) {
                Some(MemoryRegion::Config) => {
                    config.insert(addr, b);
                }
                Some(MemoryRegion::Eeprom) => {
                    eeprom.insert(addr, b);
                }
                // User ID words are programmed like a flash row
                Some(MemoryRegion::Flash | MemoryRegion::UserId) => {
                    let row = addr & !(FLASH_ROW_BYTES as u32 - 1);
                    let page = pages
                        .entry(row)
                        .or_insert_with(|| vec![0xFF; FLASH_ROW_BYTES]);
                    page[(addr - row) as usize] = b;
                }
                Some(MemoryRegion::DeviceId) | None => skipped.push(addr),
            }
        }

        ProgramPlan {
            pages: pages
                .into_iter()
                .map(|(addr, data)| Block { addr, data })
                .collect(),
            config: fill_span(&config),
            eeprom: fill_span(&eeprom),
            skipped,
        }
    }
}

/// Block covering min..=max of `bytes`, gaps set to 0xFF
fn fill_span(bytes: &BTreeMap<u32, u8>) -> Option<Block> {
    let (&first, _) = bytes.first_key_value()?;
    let (&last, _) = bytes.last_key_value()?;
    let mut data = vec![0xFF; (last - first + 1) as usize];
    for (&addr, &b) in bytes {
        data[(addr - first) as usize] = b;
    }
    Some(Block { addr: first, data })
}

/// Render `data` at `start` as Intel HEX text
pub fn to_ihex(start: u32, data: &[u8]) -> Result<String, Box<dyn std::error::Error>> {
    let mut records = Vec::new();
    let mut upper = None;

    let mut offset = 0usize;
    while offset < data.len() {
        let addr = start + offset as u32;
        let hi = (addr >> 16) as u16;
        if upper != Some(hi) {
            records.push(Record::ExtendedLinearAddress(hi));
            upper = Some(hi);
        }
        // Records never cross a 64 KiB boundary
        let to_boundary = 0x1_0000 - (addr & 0xFFFF) as usize;
        let n = RECORD_BYTES.min(data.len() - offset).min(to_boundary);
        records.push(Record::Data {
            offset: addr as u16,
            value: data[offset..offset + n].to_vec(),
        });
        offset += n;
    }
    records.push(Record::EndOfFile);

    Ok(ihex::create_object_file_representation(&records)?)
}
