//! On-medium storage format
//!
//! ```text
//! offset 0:   tag[5]            b"SUPLA"
//! offset 5:   version: u8       STORAGE_VERSION
//! offset 6:   section_count: u8
//! offset 7..: section_count × { kind: u8, size: u16, crc1: u16, crc2: u16, payload[size] }
//! ```
//!
//! All multi-byte fields are little-endian. Sections follow the preamble
//! contiguously in creation order and are never resized.

use heapless::Vec;

use crate::error::StorageError;

/// Preamble magic tag
pub const STORAGE_TAG: [u8; 5] = *b"SUPLA";

/// Storage layout version
pub const STORAGE_VERSION: u8 = 1;

/// Maximum number of sections on a medium
pub const MAX_SECTIONS: usize = 16;

/// Maximum payload size of a single section
pub const MAX_SECTION_SIZE: usize = 4096;

/// Buffer holding one section payload
pub type SectionBuf = Vec<u8, MAX_SECTION_SIZE>;

/// Storage preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    /// Magic tag
    pub tag: [u8; 5],
    /// Layout version
    pub version: u8,
    /// Number of sections following the preamble
    pub section_count: u8,
}

impl Preamble {
    /// Encoded size in bytes
    pub const SIZE: usize = 7;

    /// Create a preamble with the current tag and version
    pub const fn new(section_count: u8) -> Self {
        Self {
            tag: STORAGE_TAG,
            version: STORAGE_VERSION,
            section_count,
        }
    }

    /// Serialize preamble to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..5].copy_from_slice(&self.tag);
        buf[5] = self.version;
        buf[6] = self.section_count;
        buf
    }

    /// Deserialize preamble from bytes
    ///
    /// No validation is done here; see [`Detection::classify`].
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }

        let mut tag = [0u8; 5];
        tag.copy_from_slice(&buf[0..5]);

        Some(Self {
            tag,
            version: buf[5],
            section_count: buf[6],
        })
    }

    /// Tag and version match this build
    pub fn is_valid(&self) -> bool {
        self.tag == STORAGE_TAG && self.version == STORAGE_VERSION
    }
}

/// Result of probing a medium for a preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Blank (all zero or erased) medium
    Absent,
    /// Valid preamble declaring this many sections
    Valid(u8),
    /// Unknown tag or unsupported version
    Foreign,
}

impl Detection {
    /// Classify the raw preamble block
    pub fn classify(raw: &[u8; Preamble::SIZE]) -> Self {
        if raw.iter().all(|&b| b == 0x00) || raw.iter().all(|&b| b == 0xFF) {
            return Detection::Absent;
        }

        match Preamble::from_bytes(raw) {
            Some(preamble) if preamble.is_valid() => Detection::Valid(preamble.section_count),
            _ => Detection::Foreign,
        }
    }
}

/// Section type stored in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Typed key-value configuration map
    DeviceConfig,
    /// Reserved for per-element configuration blobs
    ElementConfig,
    /// Concatenated element state blobs
    ElementState,
    /// Application-defined section
    Custom(u8),
}

impl SectionKind {
    /// Type byte written to the medium
    pub const fn to_u8(self) -> u8 {
        match self {
            SectionKind::DeviceConfig => 1,
            SectionKind::ElementConfig => 2,
            SectionKind::ElementState => 3,
            SectionKind::Custom(id) => id,
        }
    }

    /// Application section with type byte `id`
    ///
    /// Returns `None` for ids taken by built-in sections and for 0, which
    /// is what a zeroed header reads as.
    pub const fn custom(id: u8) -> Option<Self> {
        match Self::from_u8(id) {
            SectionKind::Custom(id) if id != 0 => Some(SectionKind::Custom(id)),
            _ => None,
        }
    }

    /// Decode a type byte
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => SectionKind::DeviceConfig,
            2 => SectionKind::ElementConfig,
            3 => SectionKind::ElementState,
            id => SectionKind::Custom(id),
        }
    }
}

/// Section header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section type
    pub kind: SectionKind,
    /// Payload size in bytes
    pub size: u16,
    /// Payload CRC16
    pub crc1: u16,
    /// Copy of the payload CRC16
    pub crc2: u16,
}

impl SectionHeader {
    /// Encoded size in bytes
    pub const SIZE: usize = 7;

    /// Serialize header to bytes (little-endian)
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.kind.to_u8();
        buf[1..3].copy_from_slice(&self.size.to_le_bytes());
        buf[3..5].copy_from_slice(&self.crc1.to_le_bytes());
        buf[5..7].copy_from_slice(&self.crc2.to_le_bytes());
        buf
    }

    /// Deserialize header from bytes (little-endian)
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }

        Some(Self {
            kind: SectionKind::from_u8(buf[0]),
            size: u16::from_le_bytes([buf[1], buf[2]]),
            crc1: u16::from_le_bytes([buf[3], buf[4]]),
            crc2: u16::from_le_bytes([buf[5], buf[6]]),
        })
    }
}

/// Location of a section on the medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionEntry {
    /// Section header as last read or written
    pub header: SectionHeader,
    /// Absolute offset of the header
    pub offset: u32,
}

impl SectionEntry {
    /// Absolute offset of the first payload byte
    pub fn payload_offset(&self) -> u32 {
        self.offset + SectionHeader::SIZE as u32
    }

    /// Absolute offset just past the payload
    pub fn end_offset(&self) -> u32 {
        self.payload_offset() + self.header.size as u32
    }
}

/// Section layout scanned from (or written to) a medium
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    base_offset: u32,
    entries: Vec<SectionEntry, MAX_SECTIONS>,
}

impl SectionTable {
    /// Create an empty table for a store starting at `base_offset`
    pub fn new(base_offset: u32) -> Self {
        Self {
            base_offset,
            entries: Vec::new(),
        }
    }

    /// Offset of the preamble
    pub fn base_offset(&self) -> u32 {
        self.base_offset
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no sections
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over sections in medium order
    pub fn iter(&self) -> impl Iterator<Item = &SectionEntry> {
        self.entries.iter()
    }

    /// Find the first section of a kind
    pub fn find(&self, kind: SectionKind) -> Option<&SectionEntry> {
        self.entries.iter().find(|e| e.header.kind == kind)
    }

    /// Find the first section of a kind (mutable)
    pub fn find_mut(&mut self, kind: SectionKind) -> Option<&mut SectionEntry> {
        self.entries.iter_mut().find(|e| e.header.kind == kind)
    }

    /// Offset where the next section header goes
    pub fn next_offset(&self) -> u32 {
        self.entries
            .last()
            .map(|e| e.end_offset())
            .unwrap_or(self.base_offset + Preamble::SIZE as u32)
    }

    /// Append a section at [`next_offset`](Self::next_offset)
    pub fn push(&mut self, header: SectionHeader) -> Result<SectionEntry, StorageError> {
        let entry = SectionEntry {
            header,
            offset: self.next_offset(),
        };
        self.entries
            .push(entry)
            .map_err(|_| StorageError::TooManySections)?;
        Ok(entry)
    }

    /// Forget all sections
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_layout() {
        let bytes = Preamble::new(2).to_bytes();
        assert_eq!(&bytes[0..5], b"SUPLA");
        assert_eq!(bytes[5], STORAGE_VERSION);
        assert_eq!(bytes[6], 2);
        assert_eq!(Preamble::from_bytes(&bytes), Some(Preamble::new(2)));
    }

    #[test]
    fn test_detection() {
        assert_eq!(Detection::classify(&[0u8; 7]), Detection::Absent);
        assert_eq!(Detection::classify(&[0xFFu8; 7]), Detection::Absent);
        assert_eq!(
            Detection::classify(&Preamble::new(3).to_bytes()),
            Detection::Valid(3)
        );
        assert_eq!(Detection::classify(b"FOREIGN"), Detection::Foreign);

        let mut wrong_version = Preamble::new(1).to_bytes();
        wrong_version[5] = STORAGE_VERSION + 1;
        assert_eq!(Detection::classify(&wrong_version), Detection::Foreign);
    }

    #[test]
    fn test_section_header_layout() {
        let header = SectionHeader {
            kind: SectionKind::ElementState,
            size: 4,
            crc1: 17076,
            crc2: 17076,
        };
        let bytes = header.to_bytes();

        assert_eq!(bytes, [3, 4, 0, 0xB4, 0x42, 0xB4, 0x42]);
        assert_eq!(SectionHeader::from_bytes(&bytes), Some(header));
        assert_eq!(SectionHeader::from_bytes(&bytes[..6]), None);
    }

    #[test]
    fn test_section_kind_codes() {
        assert_eq!(SectionKind::from_u8(1), SectionKind::DeviceConfig);
        assert_eq!(SectionKind::from_u8(3), SectionKind::ElementState);
        assert_eq!(SectionKind::from_u8(42), SectionKind::Custom(42));
        assert_eq!(SectionKind::Custom(42).to_u8(), 42);
        assert_eq!(SectionKind::custom(42), Some(SectionKind::Custom(42)));
        assert_eq!(SectionKind::custom(3), None);
        assert_eq!(SectionKind::custom(0), None);
    }

    #[test]
    fn test_section_table_offsets() {
        let mut table = SectionTable::new(16);
        assert_eq!(table.next_offset(), 16 + Preamble::SIZE as u32);

        let first = table
            .push(SectionHeader {
                kind: SectionKind::DeviceConfig,
                size: 10,
                crc1: 0,
                crc2: 0,
            })
            .unwrap();
        assert_eq!(first.offset, 23);
        assert_eq!(first.payload_offset(), 30);

        let second = table
            .push(SectionHeader {
                kind: SectionKind::ElementState,
                size: 4,
                crc1: 0,
                crc2: 0,
            })
            .unwrap();
        assert_eq!(second.offset, 40);
        assert_eq!(table.find(SectionKind::ElementState), Some(&second));
        assert_eq!(table.len(), 2);
    }
}
