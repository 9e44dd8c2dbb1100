//! Mock byte-addressable medium
//!
//! Keeps two images: the working image that reads and writes see, and the
//! durable image captured by the last `commit`. [`MockMedium::power_cycle`]
//! throws the working image away, which is what a reset does to uncommitted
//! writes.

use std::vec;
use std::vec::Vec;

use devstore_core::error::MediumError;
use devstore_core::traits::Medium;

/// Mock medium with I/O counters and fault injection
#[derive(Debug, Clone)]
pub struct MockMedium {
    data: Vec<u8>,
    durable: Vec<u8>,
    initialized: bool,
    fail_init: bool,
    fail_write_in: Option<u32>,
    reads: u32,
    quiet_reads: u32,
    writes: u32,
    bytes_written: u32,
    commits: u32,
}

impl MockMedium {
    /// Create a zero-filled medium of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self::from_bytes(vec![0; capacity])
    }

    /// Create a medium in the erased (0xFF) state
    pub fn erased(capacity: usize) -> Self {
        Self::from_bytes(vec![0xFF; capacity])
    }

    /// Create a medium holding `bytes` as committed content
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            durable: bytes.clone(),
            data: bytes,
            initialized: false,
            fail_init: false,
            fail_write_in: None,
            reads: 0,
            quiet_reads: 0,
            writes: 0,
            bytes_written: 0,
            commits: 0,
        }
    }

    /// Create a medium whose `init` fails
    pub fn unavailable(capacity: usize) -> Self {
        let mut medium = Self::new(capacity);
        medium.fail_init = true;
        medium
    }

    /// Make the `nth` upcoming `write` call (1-based) fail once
    ///
    /// The failing write leaves both images untouched.
    pub fn fail_nth_write(&mut self, nth: u32) {
        self.fail_write_in = Some(nth.max(1));
    }

    /// Working image
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Image as of the last commit
    pub fn durable_contents(&self) -> &[u8] {
        &self.durable
    }

    /// Number of `read` calls
    pub fn read_count(&self) -> u32 {
        self.reads
    }

    /// Number of `read` calls with `verbose == false`
    pub fn quiet_read_count(&self) -> u32 {
        self.quiet_reads
    }

    /// Number of `write` calls
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    /// Total bytes passed to `write`
    pub fn bytes_written(&self) -> u32 {
        self.bytes_written
    }

    /// Number of `commit` calls
    pub fn commit_count(&self) -> u32 {
        self.commits
    }

    /// Reset all I/O counters
    pub fn reset_counters(&mut self) {
        self.reads = 0;
        self.quiet_reads = 0;
        self.writes = 0;
        self.bytes_written = 0;
        self.commits = 0;
    }

    /// Flip every bit of the byte at `offset` in both images
    pub fn corrupt(&mut self, offset: usize) {
        self.data[offset] ^= 0xFF;
        self.durable[offset] ^= 0xFF;
    }

    /// Overwrite committed content at `offset` in both images
    pub fn poke(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.durable[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Simulate a reset: drop uncommitted writes and detach
    pub fn power_cycle(&mut self) {
        self.data = self.durable.clone();
        self.initialized = false;
        self.reset_counters();
    }

    fn check(&self, offset: u32, len: usize) -> Result<(), MediumError> {
        if !self.initialized {
            return Err(MediumError::Unavailable);
        }
        if offset as usize + len > self.data.len() {
            return Err(MediumError::OutOfBounds);
        }
        Ok(())
    }
}

impl Medium for MockMedium {
    fn init(&mut self) -> Result<(), MediumError> {
        if self.fail_init {
            return Err(MediumError::Unavailable);
        }
        self.initialized = true;
        Ok(())
    }

    fn read(&mut self, offset: u32, buf: &mut [u8], verbose: bool) -> Result<usize, MediumError> {
        self.check(offset, buf.len())?;
        self.reads += 1;
        if !verbose {
            self.quiet_reads += 1;
        }
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(buf.len())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<usize, MediumError> {
        self.check(offset, data.len())?;
        if let Some(remaining) = self.fail_write_in {
            if remaining <= 1 {
                self.fail_write_in = None;
                return Err(MediumError::WriteFailed);
            }
            self.fail_write_in = Some(remaining - 1);
        }
        self.writes += 1;
        self.bytes_written += data.len() as u32;
        let start = offset as usize;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn commit(&mut self) -> Result<(), MediumError> {
        if !self.initialized {
            return Err(MediumError::Unavailable);
        }
        self.commits += 1;
        self.durable.clone_from(&self.data);
        Ok(())
    }

    fn capacity(&self) -> u32 {
        self.data.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_medium_read_write() {
        let mut medium = MockMedium::new(16);
        medium.init().unwrap();
        medium.write(4, &[1, 2]).unwrap();

        let mut buf = [0u8; 2];
        medium.read(4, &mut buf, false).unwrap();
        assert_eq!(buf, [1, 2]);
        assert_eq!(medium.write_count(), 1);
        assert_eq!(medium.quiet_read_count(), 1);
    }

    #[test]
    fn test_power_cycle_drops_uncommitted_writes() {
        let mut medium = MockMedium::new(8);
        medium.init().unwrap();
        medium.write(0, &[1]).unwrap();
        medium.commit().unwrap();
        medium.write(1, &[2]).unwrap();

        medium.power_cycle();
        assert_eq!(&medium.contents()[..2], &[1, 0]);
        assert_eq!(medium.commit_count(), 0);
    }

    #[test]
    fn test_fail_nth_write_fails_once() {
        let mut medium = MockMedium::new(8);
        medium.init().unwrap();
        medium.fail_nth_write(2);

        assert_eq!(medium.write(0, &[1]), Ok(1));
        assert_eq!(medium.write(1, &[2]), Err(MediumError::WriteFailed));
        assert_eq!(medium.write(1, &[3]), Ok(1));
        assert_eq!(&medium.contents()[..2], &[1, 3]);
        assert_eq!(medium.write_count(), 2);
    }

    #[test]
    fn test_unavailable_medium() {
        let mut medium = MockMedium::unavailable(8);
        assert_eq!(medium.init(), Err(MediumError::Unavailable));
        assert_eq!(medium.write(0, &[1]), Err(MediumError::Unavailable));
    }
}
