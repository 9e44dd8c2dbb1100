//! Mock EEPROM emulation

use std::vec;
use std::vec::Vec;

use crate::platform::{error::EepromError, traits::EepromInterface, Result};

/// Mock EEPROM emulation
///
/// `begin` copies the backing store into a RAM buffer, `commit` copies it
/// back. Unstarted or out-of-range access fails like the real driver.
#[derive(Debug, Clone)]
pub struct MockEeprom {
    backing: Vec<u8>,
    ram: Vec<u8>,
    started: bool,
    commits: u32,
}

impl MockEeprom {
    /// Create an erased EEPROM able to hold `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            backing: vec![0xFF; capacity],
            ram: Vec::new(),
            started: false,
            commits: 0,
        }
    }

    /// Number of driver commits
    pub fn commit_count(&self) -> u32 {
        self.commits
    }

    /// Backing store content
    pub fn backing(&self) -> &[u8] {
        &self.backing
    }

    fn check(&self, address: u32, len: usize) -> Result<()> {
        if !self.started {
            return Err(EepromError::NotStarted.into());
        }
        if address as usize + len > self.ram.len() {
            return Err(EepromError::InvalidAddress.into());
        }
        Ok(())
    }
}

impl EepromInterface for MockEeprom {
    fn begin(&mut self, size: u32) -> Result<()> {
        if size as usize > self.backing.len() {
            return Err(EepromError::TooLarge.into());
        }
        self.ram = self.backing[..size as usize].to_vec();
        self.started = true;
        Ok(())
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.check(address, buf.len())?;
        let start = address as usize;
        buf.copy_from_slice(&self.ram[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.check(address, data.len())?;
        let start = address as usize;
        self.ram[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.started {
            return Err(EepromError::NotStarted.into());
        }
        self.backing[..self.ram.len()].copy_from_slice(&self.ram);
        self.commits += 1;
        Ok(())
    }

    fn size(&self) -> u32 {
        self.ram.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_reach_backing_on_commit() {
        let mut eeprom = MockEeprom::new(64);
        eeprom.begin(32).unwrap();
        eeprom.write(0, &[1, 2]).unwrap();
        assert_eq!(&eeprom.backing()[..2], &[0xFF, 0xFF]);

        eeprom.commit().unwrap();
        assert_eq!(&eeprom.backing()[..2], &[1, 2]);
        assert_eq!(eeprom.size(), 32);
    }

    #[test]
    fn test_access_before_begin_fails() {
        let mut eeprom = MockEeprom::new(64);
        let mut buf = [0u8; 1];
        assert!(eeprom.read(0, &mut buf).is_err());
        assert!(eeprom.begin(65).is_err());
    }
}
