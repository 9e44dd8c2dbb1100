//! Mock NOR flash for testing
//!
//! Erased bytes read 0xFF and programming can only clear bits, so a missing
//! erase before a write shows up as corrupted data, like on real parts.

use core::cell::Cell;
use std::vec;
use std::vec::Vec;

use crate::platform::{error::FlashError, traits::FlashInterface, Result};

/// Erase block size (4 KB)
pub const MOCK_BLOCK_SIZE: u32 = 4096;

/// Default capacity (4 MB)
pub const MOCK_FLASH_CAPACITY: u32 = 4 * 1024 * 1024;

/// Default protected firmware region (first 256 KB)
pub const MOCK_FIRMWARE_SIZE: u32 = 0x40000;

/// Mock flash with erase counting and fault injection
///
/// # Example
///
/// ```
/// use devstore::platform::mock::MockFlash;
/// use devstore::platform::traits::FlashInterface;
///
/// let mut flash = MockFlash::new();
/// flash.erase(0x040000, 4096).unwrap();
/// flash.write(0x040000, b"SUPLA").unwrap();
///
/// let mut buf = [0u8; 5];
/// flash.read(0x040000, &mut buf).unwrap();
/// assert_eq!(&buf, b"SUPLA");
/// assert_eq!(flash.get_erase_count(0x040000), 1);
/// ```
#[derive(Debug)]
pub struct MockFlash {
    storage: Vec<u8>,
    erase_counts: Vec<u32>,
    protected: u32,
    fail_next_write: Cell<bool>,
    torn_next_write: bool,
}

impl MockFlash {
    /// Create a 4 MB flash with the first 256 KB protected
    pub fn new() -> Self {
        Self::with_layout(MOCK_FLASH_CAPACITY, MOCK_FIRMWARE_SIZE)
    }

    /// Create a flash of `capacity` bytes whose first `protected` bytes
    /// reject writes and erases
    pub fn with_layout(capacity: u32, protected: u32) -> Self {
        Self {
            storage: vec![0xFF; capacity as usize],
            erase_counts: vec![0; (capacity / MOCK_BLOCK_SIZE) as usize],
            protected,
            fail_next_write: Cell::new(false),
            torn_next_write: false,
        }
    }

    /// Copy of `len` bytes at `address`
    pub fn get_contents(&self, address: u32, len: usize) -> Vec<u8> {
        self.storage[address as usize..address as usize + len].to_vec()
    }

    /// Overwrite bytes directly, bypassing erase semantics
    pub fn inject_corruption(&mut self, address: u32, len: usize) {
        for byte in &mut self.storage[address as usize..address as usize + len] {
            *byte = 0xAA;
        }
    }

    /// Number of erases of the block containing `address`
    pub fn get_erase_count(&self, address: u32) -> u32 {
        self.erase_counts[(address / MOCK_BLOCK_SIZE) as usize]
    }

    /// Total number of block erases
    pub fn get_total_erase_count(&self) -> u32 {
        self.erase_counts.iter().sum()
    }

    /// Make the next write fail without touching the array
    pub fn fail_next_write(&self) {
        self.fail_next_write.set(true);
    }

    /// Make the next write program only its first half (power loss)
    pub fn simulate_power_loss(&mut self) {
        self.torn_next_write = true;
    }

    fn check_range(&self, address: u32, len: usize) -> Result<()> {
        if address as u64 + len as u64 > self.storage.len() as u64 {
            return Err(FlashError::InvalidAddress.into());
        }
        Ok(())
    }

    fn check_writable(&self, address: u32, len: usize) -> Result<()> {
        self.check_range(address, len)?;
        if address < self.protected {
            return Err(FlashError::InvalidAddress.into());
        }
        Ok(())
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for MockFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.check_range(address, buf.len())?;
        let start = address as usize;
        buf.copy_from_slice(&self.storage[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.check_writable(address, data.len())?;
        if self.fail_next_write.replace(false) {
            return Err(FlashError::WriteFailed.into());
        }

        let len = if core::mem::take(&mut self.torn_next_write) {
            data.len() / 2
        } else {
            data.len()
        };

        let start = address as usize;
        for (cell, byte) in self.storage[start..start + len].iter_mut().zip(data) {
            *cell &= *byte;
        }
        Ok(())
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        self.check_writable(address, size as usize)?;
        if address % MOCK_BLOCK_SIZE != 0 || size % MOCK_BLOCK_SIZE != 0 {
            return Err(FlashError::Unaligned.into());
        }

        let start = address as usize;
        self.storage[start..start + size as usize].fill(0xFF);
        for block in address / MOCK_BLOCK_SIZE..(address + size) / MOCK_BLOCK_SIZE {
            self.erase_counts[block as usize] += 1;
        }
        Ok(())
    }

    fn block_size(&self) -> u32 {
        MOCK_BLOCK_SIZE
    }

    fn capacity(&self) -> u32 {
        self.storage.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformError;

    #[test]
    fn test_write_only_clears_bits() {
        let mut flash = MockFlash::new();
        flash.write(0x040000, &[0x0F]).unwrap();
        flash.write(0x040000, &[0xF3]).unwrap();
        assert_eq!(flash.get_contents(0x040000, 1), [0x03]);

        flash.erase(0x040000, 4096).unwrap();
        assert_eq!(flash.get_contents(0x040000, 1), [0xFF]);
    }

    #[test]
    fn test_protected_region_and_alignment() {
        let mut flash = MockFlash::new();
        assert_eq!(
            flash.write(0, &[0]),
            Err(PlatformError::Flash(FlashError::InvalidAddress))
        );
        assert_eq!(
            flash.erase(0x040100, 4096),
            Err(PlatformError::Flash(FlashError::Unaligned))
        );
        assert_eq!(
            flash.erase(0x040000, 1024),
            Err(PlatformError::Flash(FlashError::Unaligned))
        );
    }

    #[test]
    fn test_erase_counts() {
        let mut flash = MockFlash::with_layout(64 * 1024, 0);
        flash.erase(0, 8192).unwrap();
        flash.erase(4096, 4096).unwrap();

        assert_eq!(flash.get_erase_count(0), 1);
        assert_eq!(flash.get_erase_count(4096), 2);
        assert_eq!(flash.get_total_erase_count(), 3);
    }

    #[test]
    fn test_power_loss_tears_write() {
        let mut flash = MockFlash::new();
        flash.simulate_power_loss();
        flash.write(0x040000, &[0x55; 8]).unwrap();

        assert_eq!(
            flash.get_contents(0x040000, 8),
            [0x55, 0x55, 0x55, 0x55, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_fail_next_write() {
        let mut flash = MockFlash::new();
        flash.fail_next_write();
        assert!(flash.write(0x040000, &[0]).is_err());
        assert!(flash.write(0x040000, &[0]).is_ok());
    }
}
