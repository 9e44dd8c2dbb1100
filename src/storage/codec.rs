//! Format codec
//!
//! Drives a [`Medium`] through the on-medium layout described in
//! [`devstore_core::format`]: preamble detection and repair, section table
//! scanning, CRC-checked section reads and change-detecting section writes.
//!
//! Writes are never committed implicitly except by [`FormatCodec::mount`]
//! and [`FormatCodec::delete_all`]. Everything else marks the codec dirty and
//! waits for [`FormatCodec::commit`].

use devstore_core::crc::{section_crcs, validate_section_crcs};
use devstore_core::error::StorageError;
use devstore_core::format::{
    Detection, Preamble, SectionBuf, SectionEntry, SectionHeader, SectionKind, SectionTable,
    MAX_SECTIONS, MAX_SECTION_SIZE,
};
use devstore_core::section::SectionStore;
use devstore_core::traits::{EraseMode, Medium};

/// Chunk size for zero fills
const FILL_CHUNK: usize = 64;

/// How the layout was found at mount time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mount {
    /// Blank medium, fresh preamble written
    Fresh,
    /// Foreign or damaged layout, fresh preamble written
    Repaired,
    /// Valid layout with this many sections
    Existing(u8),
    /// Medium unavailable, running from RAM only
    MemoryOnly,
}

/// Codec I/O counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Section writes that reached the medium
    pub physical_writes: u32,
    /// Section writes skipped because the stored bytes matched
    pub skipped_writes: u32,
    /// Medium commits issued
    pub commits: u32,
    /// Section reads rejected by the CRC check
    pub crc_failures: u32,
}

/// Storage format over a medium
pub struct FormatCodec<M: Medium> {
    medium: M,
    table: SectionTable,
    dirty: bool,
    stats: StorageStats,
}

impl<M: Medium> FormatCodec<M> {
    /// Create a codec for a store whose preamble sits at `base_offset`
    pub fn new(medium: M, base_offset: u32) -> Self {
        Self {
            medium,
            table: SectionTable::new(base_offset),
            dirty: false,
            stats: StorageStats::default(),
        }
    }

    /// Access the medium
    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Access the medium (mutable)
    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    /// Release the medium
    pub fn into_inner(self) -> M {
        self.medium
    }

    /// Section layout as last scanned or written
    pub fn table(&self) -> &SectionTable {
        &self.table
    }

    /// I/O counters
    pub fn stats(&self) -> StorageStats {
        self.stats
    }

    /// Uncommitted writes are pending
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Probe the preamble
    pub fn detect(&mut self) -> Result<Detection, StorageError> {
        let base = self.table.base_offset();
        if base as u64 + Preamble::SIZE as u64 > self.medium.capacity() as u64 {
            return Err(StorageError::NoSpace);
        }

        let mut raw = [0u8; Preamble::SIZE];
        self.medium.read(base, &mut raw, true)?;
        Ok(Detection::classify(&raw))
    }

    /// Read `count` section headers into the table
    ///
    /// Fails with `StorageError::Layout` when a header is implausible or a
    /// section runs past the end of the medium.
    pub fn scan(&mut self, count: u8) -> Result<(), StorageError> {
        self.table.clear();
        let capacity = self.medium.capacity() as u64;

        for _ in 0..count {
            let offset = self.table.next_offset();
            if offset as u64 + SectionHeader::SIZE as u64 > capacity {
                return Err(StorageError::Layout);
            }

            let mut raw = [0u8; SectionHeader::SIZE];
            self.medium.read(offset, &mut raw, true)?;
            let header = SectionHeader::from_bytes(&raw).ok_or(StorageError::Layout)?;

            let end = offset as u64 + SectionHeader::SIZE as u64 + header.size as u64;
            if header.kind.to_u8() == 0 || header.size as usize > MAX_SECTION_SIZE || end > capacity {
                return Err(StorageError::Layout);
            }
            self.table.push(header).map_err(|_| StorageError::Layout)?;
        }

        crate::log_debug!("Scanned {} sections", count);
        Ok(())
    }

    /// Write a preamble declaring no sections and commit it
    pub fn initialize_blank(&mut self) -> Result<(), StorageError> {
        self.table.clear();
        self.medium
            .write(self.table.base_offset(), &Preamble::new(0).to_bytes())?;
        self.dirty = true;
        self.commit()?;
        Ok(())
    }

    /// Attach to the layout on the medium, writing a blank one if needed
    ///
    /// A valid layout is only scanned. Nothing is written or committed.
    pub fn mount(&mut self) -> Result<Mount, StorageError> {
        match self.detect()? {
            Detection::Absent => {
                crate::log_info!("Blank storage, writing preamble");
                self.initialize_blank()?;
                Ok(Mount::Fresh)
            }
            Detection::Foreign => {
                crate::log_warn!("Unknown storage preamble, reinitializing");
                self.initialize_blank()?;
                Ok(Mount::Repaired)
            }
            Detection::Valid(count) => match self.scan(count) {
                Ok(()) => Ok(Mount::Existing(count)),
                Err(StorageError::Layout) => {
                    crate::log_warn!("Damaged section table, reinitializing");
                    self.initialize_blank()?;
                    Ok(Mount::Repaired)
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Append a zero-filled section of `size` bytes
    ///
    /// The header carries the CRCs of the zero payload, so a new section
    /// reads back as valid zeros until it is written.
    pub fn append_section(&mut self, kind: SectionKind, size: u16) -> Result<(), StorageError> {
        if size as usize > MAX_SECTION_SIZE {
            return Err(StorageError::NoSpace);
        }
        let offset = self.table.next_offset();
        let end = offset as u64 + SectionHeader::SIZE as u64 + size as u64;
        if end > self.medium.capacity() as u64 {
            crate::log_error!("No space for section {} ({} bytes)", kind.to_u8(), size);
            return Err(StorageError::NoSpace);
        }

        let mut zeros = SectionBuf::new();
        zeros
            .resize(size as usize, 0)
            .map_err(|_| StorageError::NoSpace)?;
        let (crc1, crc2) = section_crcs(&zeros);
        let header = SectionHeader {
            kind,
            size,
            crc1,
            crc2,
        };

        if self.table.len() >= MAX_SECTIONS {
            return Err(StorageError::TooManySections);
        }

        // The table only learns about the section once the medium holds it
        let entry = SectionEntry { header, offset };
        let mut pos = entry.payload_offset();
        for chunk in zeros.chunks(FILL_CHUNK) {
            self.medium.write(pos, chunk)?;
            pos += chunk.len() as u32;
        }
        self.medium.write(entry.offset, &header.to_bytes())?;
        self.medium.write(
            self.table.base_offset(),
            &Preamble::new(self.table.len() as u8 + 1).to_bytes(),
        )?;
        self.table.push(header)?;

        self.dirty = true;
        self.stats.physical_writes = self.stats.physical_writes.wrapping_add(1);
        crate::log_info!("Added section {} with {} bytes", kind.to_u8(), size);
        Ok(())
    }

    /// Flush pending writes
    ///
    /// Returns `Ok(false)` without touching the medium when nothing is dirty.
    pub fn commit(&mut self) -> Result<bool, StorageError> {
        if !self.dirty {
            return Ok(false);
        }

        self.medium.commit()?;
        self.dirty = false;
        self.stats.commits = self.stats.commits.wrapping_add(1);
        crate::log_debug!("Storage committed");
        Ok(true)
    }

    /// Sector-aligned length covering `start..end`, if the medium erases by sector
    fn erase_span(&self, start: u32, end: u32) -> Option<u32> {
        let sector = match self.medium.erase_mode() {
            EraseMode::Sector(sector) if sector > 0 => sector,
            EraseMode::Sector(_) | EraseMode::ByteWrite | EraseMode::WholeFile => return None,
        };
        if start % sector != 0 {
            return None;
        }
        let len = (end - start).div_ceil(sector) * sector;
        (start as u64 + len as u64 <= self.medium.capacity() as u64).then_some(len)
    }

    /// Blank the preamble and every known section, then commit
    ///
    /// Sector-erased media get the covering sectors erased when the layout
    /// starts on a sector boundary. Everything else is overwritten with zeros.
    pub fn delete_all(&mut self) -> Result<(), StorageError> {
        let start = self.table.base_offset();
        let end = self.table.next_offset();

        match self.erase_span(start, end) {
            Some(len) => self.medium.erase_sector(start, len)?,
            None => {
                let zeros = [0u8; FILL_CHUNK];
                let mut pos = start;
                while pos < end {
                    let len = (end - pos).min(FILL_CHUNK as u32);
                    self.medium.write(pos, &zeros[..len as usize])?;
                    pos += len;
                }
            }
        }

        self.table.clear();
        self.dirty = true;
        self.commit()?;
        crate::log_warn!("Storage erased");
        Ok(())
    }
}

impl<M: Medium> SectionStore for FormatCodec<M> {
    fn section_size(&self, kind: SectionKind) -> Option<u16> {
        self.table.find(kind).map(|e| e.header.size)
    }

    fn ensure_section(&mut self, kind: SectionKind, size: u16) -> Result<u16, StorageError> {
        if let Some(existing) = self.section_size(kind) {
            return Ok(existing);
        }
        self.append_section(kind, size)?;
        Ok(size)
    }

    fn read_section(&mut self, kind: SectionKind) -> Result<Option<SectionBuf>, StorageError> {
        let entry = match self.table.find(kind) {
            Some(entry) => *entry,
            None => return Ok(None),
        };

        let mut payload = SectionBuf::new();
        payload
            .resize(entry.header.size as usize, 0)
            .map_err(|_| StorageError::Layout)?;
        self.medium.read(entry.payload_offset(), &mut payload, true)?;

        let header = entry.header;
        if header.crc1 != header.crc2 {
            crate::log_warn!("Section {} has mismatched CRC copies", kind.to_u8());
        }
        if !validate_section_crcs(&payload, header.crc1, header.crc2) {
            self.stats.crc_failures = self.stats.crc_failures.wrapping_add(1);
            crate::log_warn!("Section {} failed CRC check", kind.to_u8());
            return Ok(None);
        }

        Ok(Some(payload))
    }

    fn write_section(&mut self, kind: SectionKind, payload: &[u8]) -> Result<bool, StorageError> {
        let entry = *self.table.find(kind).ok_or(StorageError::SectionMissing)?;
        let size = entry.header.size as usize;
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

        let (crc1, crc2) = section_crcs(&padded);
        let header = SectionHeader {
            kind,
            size: entry.header.size,
            crc1,
            crc2,
        };

        let mut stored_header = [0u8; SectionHeader::SIZE];
        self.medium.read(entry.offset, &mut stored_header, false)?;
        let mut stored = SectionBuf::new();
        stored
            .resize(size, 0)
            .map_err(|_| StorageError::SectionTooSmall)?;
        self.medium.read(entry.payload_offset(), &mut stored, false)?;

        let header_bytes = header.to_bytes();
        let first = stored.iter().zip(padded.iter()).position(|(a, b)| a != b);
        let header_changed = stored_header != header_bytes;

        if first.is_none() && !header_changed {
            self.stats.skipped_writes = self.stats.skipped_writes.wrapping_add(1);
            return Ok(false);
        }

        if let Some(first) = first {
            let last = stored
                .iter()
                .zip(padded.iter())
                .rposition(|(a, b)| a != b)
                .unwrap_or(first);
            self.medium
                .write(entry.payload_offset() + first as u32, &padded[first..=last])?;
        }
        if header_changed {
            self.medium.write(entry.offset, &header_bytes)?;
        }

        if let Some(slot) = self.table.find_mut(kind) {
            slot.header = header;
        }
        self.dirty = true;
        self.stats.physical_writes = self.stats.physical_writes.wrapping_add(1);
        crate::log_debug!("Section {} written", kind.to_u8());
        Ok(true)
    }
}
