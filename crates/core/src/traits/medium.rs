//! Storage medium trait
//!
//! A medium is the byte-addressable backing store behind the storage format:
//! raw EEPROM emulation, a NOR flash partition or a whole file.
//!
//! # Durability
//!
//! Writes may be buffered by the medium. Nothing written is guaranteed to
//! survive a power cycle until [`Medium::commit`] returns `Ok`.

use crate::error::MediumError;

/// Erase granularity of a medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseMode {
    /// Any byte can be rewritten in place (EEPROM-like)
    ByteWrite,
    /// Rewriting requires erasing whole sectors of this many bytes
    Sector(u32),
    /// The whole image is rewritten on commit (file-backed)
    WholeFile,
}

/// Byte-addressable storage medium
pub trait Medium {
    /// Attach the backing resource
    ///
    /// # Errors
    ///
    /// Returns `MediumError::Unavailable` if the resource is missing. The
    /// storage layer then runs in memory-only mode.
    fn init(&mut self) -> Result<(), MediumError>;

    /// Read `buf.len()` bytes starting at `offset`
    ///
    /// `verbose` is false for change-detection reads issued right before a
    /// write; implementations that log reads should stay quiet for those.
    /// Returns the number of bytes read.
    fn read(&mut self, offset: u32, buf: &mut [u8], verbose: bool) -> Result<usize, MediumError>;

    /// Write `data` starting at `offset`
    ///
    /// Returns the number of bytes written.
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<usize, MediumError>;

    /// Erase `len` bytes starting at `offset`
    ///
    /// No-op for media that support byte-granular rewrites.
    fn erase_sector(&mut self, offset: u32, len: u32) -> Result<(), MediumError> {
        let _ = (offset, len);
        Ok(())
    }

    /// Flush pending writes durably
    fn commit(&mut self) -> Result<(), MediumError>;

    /// Usable size in bytes
    fn capacity(&self) -> u32;

    /// Erase granularity
    ///
    /// Regular writes never need it: media that erase by sector do so
    /// themselves on `commit`. The codec uses it to wipe a sector-aligned
    /// layout with [`erase_sector`](Self::erase_sector) instead of zero fills.
    fn erase_mode(&self) -> EraseMode {
        EraseMode::ByteWrite
    }
}

impl<M: Medium + ?Sized> Medium for &mut M {
    fn init(&mut self) -> Result<(), MediumError> {
        (**self).init()
    }

    fn read(&mut self, offset: u32, buf: &mut [u8], verbose: bool) -> Result<usize, MediumError> {
        (**self).read(offset, buf, verbose)
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<usize, MediumError> {
        (**self).write(offset, data)
    }

    fn erase_sector(&mut self, offset: u32, len: u32) -> Result<(), MediumError> {
        (**self).erase_sector(offset, len)
    }

    fn commit(&mut self) -> Result<(), MediumError> {
        (**self).commit()
    }

    fn capacity(&self) -> u32 {
        (**self).capacity()
    }

    fn erase_mode(&self) -> EraseMode {
        (**self).erase_mode()
    }
}
