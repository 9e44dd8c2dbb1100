//! NOR flash partition medium
//!
//! The whole partition is mirrored in RAM. Writes only touch the mirror and
//! mark the affected erase sectors dirty; `commit` erases and reprograms the
//! dirty sectors whose flash content actually differs from the mirror.
//!
//! # Memory Layout
//!
//! ```text
//! [partition_offset .. partition_offset + N]   N = shadow size, sector aligned
//! ```

use devstore_core::error::MediumError;
use devstore_core::traits::{EraseMode, Medium};
use heapless::Vec;

use crate::platform::traits::FlashInterface;

/// Maximum number of erase sectors in a partition
pub const MAX_PARTITION_SECTORS: u32 = 64;

/// Chunk size used when comparing flash against the mirror
const COMPARE_CHUNK: usize = 256;

/// Medium over a sector-erased flash partition
pub struct SectorFlashMedium<F: FlashInterface, const N: usize> {
    flash: F,
    partition_offset: u32,
    shadow: Vec<u8, N>,
    dirty: u64,
    sector_size: u32,
}

impl<F: FlashInterface, const N: usize> SectorFlashMedium<F, N> {
    /// Create a medium over `N` bytes of flash starting at `partition_offset`
    pub fn new(flash: F, partition_offset: u32) -> Self {
        Self {
            flash,
            partition_offset,
            shadow: Vec::new(),
            dirty: 0,
            sector_size: 0,
        }
    }

    /// Access the underlying flash
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Access the underlying flash mutably
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Number of sectors waiting for `commit`
    pub fn dirty_sectors(&self) -> u32 {
        self.dirty.count_ones()
    }

    fn check(&self, offset: u32, len: usize) -> Result<(), MediumError> {
        if self.shadow.is_empty() {
            return Err(MediumError::Unavailable);
        }
        if offset as usize + len > self.shadow.len() {
            return Err(MediumError::OutOfBounds);
        }
        Ok(())
    }

    fn mark_dirty(&mut self, offset: u32, len: usize) {
        if len == 0 {
            return;
        }
        let first = offset / self.sector_size;
        let last = (offset + len as u32 - 1) / self.sector_size;
        for sector in first..=last {
            self.dirty |= 1u64 << sector;
        }
    }

    fn sector_differs(&mut self, sector: u32) -> Result<bool, MediumError> {
        let start = (sector * self.sector_size) as usize;
        let end = start + self.sector_size as usize;
        let mut chunk = [0u8; COMPARE_CHUNK];

        let mut pos = start;
        while pos < end {
            let len = COMPARE_CHUNK.min(end - pos);
            self.flash
                .read(self.partition_offset + pos as u32, &mut chunk[..len])?;
            if chunk[..len] != self.shadow[pos..pos + len] {
                return Ok(true);
            }
            pos += len;
        }
        Ok(false)
    }
}

impl<F: FlashInterface, const N: usize> Medium for SectorFlashMedium<F, N> {
    fn init(&mut self) -> Result<(), MediumError> {
        let sector_size = self.flash.block_size();
        if sector_size == 0
            || self.partition_offset % sector_size != 0
            || N as u32 % sector_size != 0
        {
            crate::log_error!("Flash partition not aligned to {} byte sectors", sector_size);
            return Err(MediumError::Misaligned);
        }
        if N as u32 / sector_size > MAX_PARTITION_SECTORS
            || self.partition_offset as u64 + N as u64 > self.flash.capacity() as u64
        {
            crate::log_error!("Flash partition at {} does not fit", self.partition_offset);
            return Err(MediumError::Unavailable);
        }

        self.sector_size = sector_size;
        self.shadow.clear();
        self.shadow
            .resize(N, 0xFF)
            .map_err(|_| MediumError::Unavailable)?;
        self.flash.read(self.partition_offset, &mut self.shadow)?;
        self.dirty = 0;

        crate::log_debug!(
            "Flash partition at {} mounted, {} sectors",
            self.partition_offset,
            N as u32 / sector_size
        );
        Ok(())
    }

    fn read(&mut self, offset: u32, buf: &mut [u8], verbose: bool) -> Result<usize, MediumError> {
        self.check(offset, buf.len())?;
        if verbose {
            crate::log_trace!("Flash read {} bytes at {}", buf.len(), offset);
        }
        let start = offset as usize;
        buf.copy_from_slice(&self.shadow[start..start + buf.len()]);
        Ok(buf.len())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<usize, MediumError> {
        self.check(offset, data.len())?;
        let start = offset as usize;
        self.shadow[start..start + data.len()].copy_from_slice(data);
        self.mark_dirty(offset, data.len());
        Ok(data.len())
    }

    fn erase_sector(&mut self, offset: u32, len: u32) -> Result<(), MediumError> {
        self.check(offset, len as usize)?;
        if offset % self.sector_size != 0 || len % self.sector_size != 0 {
            return Err(MediumError::Misaligned);
        }

        self.flash.erase(self.partition_offset + offset, len)?;
        let start = offset as usize;
        self.shadow[start..start + len as usize].fill(0xFF);
        for sector in offset / self.sector_size..(offset + len) / self.sector_size {
            self.dirty &= !(1u64 << sector);
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), MediumError> {
        if self.shadow.is_empty() {
            return Err(MediumError::Unavailable);
        }

        let mut programmed = 0u32;
        let sectors = N as u32 / self.sector_size;
        for sector in 0..sectors {
            if self.dirty & (1u64 << sector) == 0 {
                continue;
            }
            if self.sector_differs(sector)? {
                let start = sector * self.sector_size;
                let range = start as usize..(start + self.sector_size) as usize;
                self.flash
                    .erase(self.partition_offset + start, self.sector_size)?;
                self.flash
                    .write(self.partition_offset + start, &self.shadow[range])?;
                programmed += 1;
            }
            self.dirty &= !(1u64 << sector);
        }

        if programmed > 0 {
            crate::log_debug!("Flash commit programmed {} sectors", programmed);
        }
        Ok(())
    }

    fn capacity(&self) -> u32 {
        N as u32
    }

    fn erase_mode(&self) -> EraseMode {
        EraseMode::Sector(self.sector_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockFlash;

    const PARTITION: u32 = 0x040000;

    fn mounted() -> SectorFlashMedium<MockFlash, 8192> {
        let mut medium = SectorFlashMedium::new(MockFlash::new(), PARTITION);
        medium.init().unwrap();
        medium
    }

    #[test]
    fn test_fresh_partition_reads_erased() {
        let mut medium = mounted();
        let mut buf = [0u8; 7];
        medium.read(0, &mut buf, true).unwrap();
        assert_eq!(buf, [0xFF; 7]);
        assert_eq!(medium.erase_mode(), EraseMode::Sector(4096));
    }

    #[test]
    fn test_writes_reach_flash_only_on_commit() {
        let mut medium = mounted();
        medium.write(4100, &[1, 2, 3]).unwrap();
        assert_eq!(medium.dirty_sectors(), 1);
        assert_eq!(medium.flash().get_contents(PARTITION + 4100, 3), [0xFF; 3]);

        medium.commit().unwrap();
        assert_eq!(medium.flash().get_contents(PARTITION + 4100, 3), [1, 2, 3]);
        assert_eq!(medium.flash().get_erase_count(PARTITION + 4096), 1);
        assert_eq!(medium.flash().get_erase_count(PARTITION), 0);
        assert_eq!(medium.dirty_sectors(), 0);
    }

    #[test]
    fn test_identical_sector_is_not_erased() {
        let mut medium = mounted();
        medium.write(0, &[0xFF; 16]).unwrap();
        medium.commit().unwrap();
        assert_eq!(medium.flash().get_total_erase_count(), 0);
    }

    #[test]
    fn test_write_spanning_sectors() {
        let mut medium = mounted();
        medium.write(4090, &[0u8; 12]).unwrap();
        assert_eq!(medium.dirty_sectors(), 2);
        medium.commit().unwrap();
        assert_eq!(medium.flash().get_total_erase_count(), 2);
    }

    #[test]
    fn test_erase_sector() {
        let mut medium = mounted();
        medium.write(0, &[0u8; 8]).unwrap();
        medium.commit().unwrap();

        medium.erase_sector(0, 4096).unwrap();
        let mut buf = [0u8; 8];
        medium.read(0, &mut buf, false).unwrap();
        assert_eq!(buf, [0xFF; 8]);
        assert_eq!(medium.erase_sector(100, 4096), Err(MediumError::Misaligned));
    }

    #[test]
    fn test_misaligned_partition_fails_init() {
        let mut medium: SectorFlashMedium<MockFlash, 8192> =
            SectorFlashMedium::new(MockFlash::new(), PARTITION + 100);
        assert_eq!(medium.init(), Err(MediumError::Misaligned));

        let mut buf = [0u8; 1];
        assert_eq!(medium.read(0, &mut buf, true), Err(MediumError::Unavailable));
    }

    #[test]
    fn test_remount_reads_committed_data() {
        let mut medium = mounted();
        medium.write(20, b"persist").unwrap();
        medium.commit().unwrap();

        let flash = core::mem::take(medium.flash_mut());
        let mut remounted: SectorFlashMedium<MockFlash, 8192> =
            SectorFlashMedium::new(flash, PARTITION);
        remounted.init().unwrap();

        let mut buf = [0u8; 7];
        remounted.read(20, &mut buf, true).unwrap();
        assert_eq!(&buf, b"persist");
    }
}
