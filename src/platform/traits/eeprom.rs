//! EEPROM emulation interface trait
//!
//! Arduino-style EEPROM emulation: a RAM buffer of a fixed size that is
//! written back to a reserved flash area on `commit`.

use crate::platform::Result;

/// EEPROM emulation interface
pub trait EepromInterface {
    /// Reserve `size` bytes and load them from the backing store
    fn begin(&mut self, size: u32) -> Result<()>;

    /// Read `buf.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `address` into the RAM buffer
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Write the RAM buffer back to the backing store
    fn commit(&mut self) -> Result<()>;

    /// Size passed to the last successful `begin`, 0 before that
    fn size(&self) -> u32;
}
