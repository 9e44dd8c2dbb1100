//! Section access seam
//!
//! The state registry and the config store never touch a medium directly.
//! They read and write whole section payloads through [`SectionStore`],
//! which the root crate implements on top of the format codec.

use heapless::Vec;

use crate::error::StorageError;
use crate::format::{SectionBuf, SectionKind, MAX_SECTIONS, MAX_SECTION_SIZE};

/// Whole-payload access to typed sections
pub trait SectionStore {
    /// Declared payload size of a section, if present
    fn section_size(&self, kind: SectionKind) -> Option<u16>;

    /// Return the declared size of `kind`, appending a zero-filled section of
    /// `size` bytes if it does not exist yet
    fn ensure_section(&mut self, kind: SectionKind, size: u16) -> Result<u16, StorageError>;

    /// Read a section payload
    ///
    /// Returns `Ok(None)` if the section is absent or fails its CRC check.
    fn read_section(&mut self, kind: SectionKind) -> Result<Option<SectionBuf>, StorageError>;

    /// Write a section payload
    ///
    /// Payloads shorter than the declared size are zero padded. Returns
    /// `Ok(false)` when the stored payload already matched and nothing was
    /// written.
    fn write_section(&mut self, kind: SectionKind, payload: &[u8]) -> Result<bool, StorageError>;
}

/// In-memory section store
///
/// Keeps payloads in RAM with the same size and padding rules as the codec.
/// Used for host tests of code layered on [`SectionStore`].
#[derive(Debug, Default)]
pub struct MemorySectionStore {
    sections: Vec<(SectionKind, SectionBuf, bool), MAX_SECTIONS>,
    writes: u32,
}

impl MemorySectionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            writes: 0,
        }
    }

    /// Number of `write_section` calls that changed a payload
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    /// Mark a section as failing its CRC check
    pub fn corrupt(&mut self, kind: SectionKind) {
        if let Some(section) = self.sections.iter_mut().find(|s| s.0 == kind) {
            section.2 = false;
        }
    }

    /// Raw payload of a section, regardless of validity
    pub fn raw(&self, kind: SectionKind) -> Option<&[u8]> {
        self.sections
            .iter()
            .find(|s| s.0 == kind)
            .map(|s| s.1.as_slice())
    }
}

impl SectionStore for MemorySectionStore {
    fn section_size(&self, kind: SectionKind) -> Option<u16> {
        self.raw(kind).map(|p| p.len() as u16)
    }

    fn ensure_section(&mut self, kind: SectionKind, size: u16) -> Result<u16, StorageError> {
        if let Some(existing) = self.section_size(kind) {
            return Ok(existing);
        }
        if size as usize > MAX_SECTION_SIZE {
            return Err(StorageError::NoSpace);
        }

        let mut payload = SectionBuf::new();
        payload
            .resize(size as usize, 0)
            .map_err(|_| StorageError::NoSpace)?;
        self.sections
            .push((kind, payload, true))
            .map_err(|_| StorageError::TooManySections)?;
        Ok(size)
    }

    fn read_section(&mut self, kind: SectionKind) -> Result<Option<SectionBuf>, StorageError> {
        Ok(self
            .sections
            .iter()
            .find(|s| s.0 == kind && s.2)
            .map(|s| s.1.clone()))
    }

    fn write_section(&mut self, kind: SectionKind, payload: &[u8]) -> Result<bool, StorageError> {
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.0 == kind)
            .ok_or(StorageError::SectionMissing)?;

        let size = section.1.len();
        if payload.len() > size {
            return Err(StorageError::SectionTooSmall);
        }

        let mut padded = SectionBuf::new();
        padded
            .extend_from_slice(payload)
            .map_err(|_| StorageError::SectionTooSmall)?;
        padded
            .resize(size, 0)
            .map_err(|_| StorageError::SectionTooSmall)?;

        if section.2 && section.1 == padded {
            return Ok(false);
        }

        section.1 = padded;
        section.2 = true;
        self.writes += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_section_is_idempotent() {
        let mut store = MemorySectionStore::new();
        assert_eq!(store.ensure_section(SectionKind::ElementState, 8), Ok(8));
        assert_eq!(store.ensure_section(SectionKind::ElementState, 16), Ok(8));
        assert_eq!(store.section_size(SectionKind::ElementState), Some(8));
    }

    #[test]
    fn test_write_pads_and_skips_identical() {
        let mut store = MemorySectionStore::new();
        store.ensure_section(SectionKind::Custom(9), 4).unwrap();

        assert_eq!(store.write_section(SectionKind::Custom(9), &[1, 2]), Ok(true));
        assert_eq!(store.raw(SectionKind::Custom(9)), Some(&[1u8, 2, 0, 0][..]));
        assert_eq!(store.write_section(SectionKind::Custom(9), &[1, 2]), Ok(false));
        assert_eq!(store.write_count(), 1);

        assert_eq!(
            store.write_section(SectionKind::Custom(9), &[0; 5]),
            Err(StorageError::SectionTooSmall)
        );
    }

    #[test]
    fn test_corrupt_section_reads_as_absent() {
        let mut store = MemorySectionStore::new();
        store.ensure_section(SectionKind::ElementState, 2).unwrap();
        store.corrupt(SectionKind::ElementState);
        assert_eq!(store.read_section(SectionKind::ElementState), Ok(None));
    }
}
