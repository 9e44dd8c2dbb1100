//! EEPROM emulation medium

use devstore_core::error::MediumError;
use devstore_core::traits::{EraseMode, Medium};

use crate::platform::traits::EepromInterface;

/// Medium over an Arduino-style EEPROM emulation
///
/// Bytes can be rewritten in place. `commit` is forwarded to the driver only
/// when something was written since the previous commit, because each driver
/// commit rewrites the backing flash page.
pub struct EepromMedium<E: EepromInterface> {
    eeprom: E,
    reserved_size: u32,
    started: bool,
    data_changed: bool,
}

impl<E: EepromInterface> EepromMedium<E> {
    /// Create a medium reserving `reserved_size` bytes of the EEPROM
    pub fn new(eeprom: E, reserved_size: u32) -> Self {
        Self {
            eeprom,
            reserved_size,
            started: false,
            data_changed: false,
        }
    }

    /// Access the underlying driver
    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    /// Release the underlying driver
    pub fn into_inner(self) -> E {
        self.eeprom
    }

    fn check(&self, offset: u32, len: usize) -> Result<(), MediumError> {
        if !self.started {
            return Err(MediumError::Unavailable);
        }
        if offset as u64 + len as u64 > self.reserved_size as u64 {
            return Err(MediumError::OutOfBounds);
        }
        Ok(())
    }
}

impl<E: EepromInterface> Medium for EepromMedium<E> {
    fn init(&mut self) -> Result<(), MediumError> {
        self.eeprom.begin(self.reserved_size)?;
        self.started = true;
        crate::log_debug!("EEPROM medium started, {} bytes", self.reserved_size);
        Ok(())
    }

    fn read(&mut self, offset: u32, buf: &mut [u8], verbose: bool) -> Result<usize, MediumError> {
        self.check(offset, buf.len())?;
        if verbose {
            crate::log_trace!("EEPROM read {} bytes at {}", buf.len(), offset);
        }
        self.eeprom.read(offset, buf)?;
        Ok(buf.len())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<usize, MediumError> {
        self.check(offset, data.len())?;
        crate::log_trace!("EEPROM write {} bytes at {}", data.len(), offset);
        self.eeprom.write(offset, data)?;
        self.data_changed = true;
        Ok(data.len())
    }

    fn commit(&mut self) -> Result<(), MediumError> {
        if !self.started {
            return Err(MediumError::Unavailable);
        }
        if self.data_changed {
            self.eeprom.commit()?;
            self.data_changed = false;
        }
        Ok(())
    }

    fn capacity(&self) -> u32 {
        self.reserved_size
    }

    fn erase_mode(&self) -> EraseMode {
        EraseMode::ByteWrite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockEeprom;

    #[test]
    fn test_unstarted_medium_is_unavailable() {
        let mut medium = EepromMedium::new(MockEeprom::new(512), 256);
        let mut buf = [0u8; 4];
        assert_eq!(medium.read(0, &mut buf, true), Err(MediumError::Unavailable));
    }

    #[test]
    fn test_begin_failure_is_reported() {
        let mut medium = EepromMedium::new(MockEeprom::new(128), 256);
        assert_eq!(medium.init(), Err(MediumError::Unavailable));
    }

    #[test]
    fn test_commit_only_after_changes() {
        let mut medium = EepromMedium::new(MockEeprom::new(512), 256);
        medium.init().unwrap();

        medium.commit().unwrap();
        assert_eq!(medium.eeprom().commit_count(), 0);

        medium.write(10, &[1, 2, 3]).unwrap();
        medium.commit().unwrap();
        medium.commit().unwrap();
        assert_eq!(medium.eeprom().commit_count(), 1);

        let mut buf = [0u8; 3];
        medium.read(10, &mut buf, false).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_bounds() {
        let mut medium = EepromMedium::new(MockEeprom::new(512), 256);
        medium.init().unwrap();
        assert_eq!(medium.write(250, &[0; 8]), Err(MediumError::OutOfBounds));
        assert_eq!(medium.capacity(), 256);
    }
}
