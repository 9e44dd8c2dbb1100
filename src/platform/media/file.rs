//! Whole-file medium for hosted targets
//!
//! The image lives in memory. `commit` rewrites the file only when the image
//! changed, through a temporary file that is synced and then renamed over the
//! old one. The parent directory is synced after the rename.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::vec::Vec;

use devstore_core::error::MediumError;
use devstore_core::traits::{EraseMode, Medium};

/// Default image file name
pub const DEFAULT_FILE_NAME: &str = "state.bin";

/// Medium backed by a single file
pub struct FileMedium {
    path: PathBuf,
    reserved_size: u32,
    image: Vec<u8>,
    loaded: bool,
    dirty: bool,
}

impl FileMedium {
    /// Create a medium storing `reserved_size` bytes in `path`
    pub fn new(path: impl Into<PathBuf>, reserved_size: u32) -> Self {
        Self {
            path: path.into(),
            reserved_size,
            image: Vec::new(),
            loaded: false,
            dirty: false,
        }
    }

    /// Create a medium storing its image as [`DEFAULT_FILE_NAME`] in `dir`
    pub fn in_dir(dir: impl AsRef<Path>, reserved_size: u32) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_FILE_NAME), reserved_size)
    }

    /// Path of the image file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn check(&self, offset: u32, len: usize) -> Result<(), MediumError> {
        if !self.loaded {
            return Err(MediumError::Unavailable);
        }
        if offset as usize + len > self.image.len() {
            return Err(MediumError::OutOfBounds);
        }
        Ok(())
    }
}

impl Medium for FileMedium {
    fn init(&mut self) -> Result<(), MediumError> {
        let mut image = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                crate::log_info!("Storage file missing, starting blank");
                Vec::new()
            }
            Err(_) => {
                crate::log_error!("Storage file unreadable");
                return Err(MediumError::Unavailable);
            }
        };
        image.resize(self.reserved_size as usize, 0);

        self.image = image;
        self.loaded = true;
        self.dirty = false;
        Ok(())
    }

    fn read(&mut self, offset: u32, buf: &mut [u8], verbose: bool) -> Result<usize, MediumError> {
        self.check(offset, buf.len())?;
        if verbose {
            crate::log_trace!("File read {} bytes at {}", buf.len(), offset);
        }
        let start = offset as usize;
        buf.copy_from_slice(&self.image[start..start + buf.len()]);
        Ok(buf.len())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<usize, MediumError> {
        self.check(offset, data.len())?;
        let start = offset as usize;
        self.image[start..start + data.len()].copy_from_slice(data);
        self.dirty = true;
        Ok(data.len())
    }

    fn commit(&mut self) -> Result<(), MediumError> {
        if !self.loaded {
            return Err(MediumError::Unavailable);
        }
        if !self.dirty {
            return Ok(());
        }

        let parent = self.path.parent();
        if let Some(parent) = parent {
            fs::create_dir_all(parent).map_err(|_| MediumError::WriteFailed)?;
        }
        let tmp = self.temp_path();
        let mut file = File::create(&tmp).map_err(|_| MediumError::WriteFailed)?;
        file.write_all(&self.image).map_err(|_| MediumError::WriteFailed)?;
        file.sync_all().map_err(|_| MediumError::WriteFailed)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(|_| MediumError::WriteFailed)?;

        // Make the rename itself durable
        if let Some(dir) = parent.and_then(|p| File::open(p).ok()) {
            if dir.sync_all().is_err() {
                crate::log_warn!("Storage directory sync failed");
            }
        }

        self.dirty = false;
        crate::log_debug!("Storage file written, {} bytes", self.image.len());
        Ok(())
    }

    fn capacity(&self) -> u32 {
        self.reserved_size
    }

    fn erase_mode(&self) -> EraseMode {
        EraseMode::WholeFile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_zeroed() {
        let dir = tempfile::tempdir().unwrap();
        let mut medium = FileMedium::in_dir(dir.path(), 64);
        medium.init().unwrap();

        let mut buf = [0xAAu8; 8];
        medium.read(0, &mut buf, true).unwrap();
        assert_eq!(buf, [0u8; 8]);
        assert!(!medium.path().exists());
    }

    #[test]
    fn test_commit_persists_and_skips_clean() {
        let dir = tempfile::tempdir().unwrap();
        let mut medium = FileMedium::in_dir(dir.path(), 64);
        medium.init().unwrap();

        medium.commit().unwrap();
        assert!(!medium.path().exists());

        medium.write(3, b"abc").unwrap();
        medium.commit().unwrap();

        let mut reopened = FileMedium::in_dir(dir.path(), 64);
        reopened.init().unwrap();
        let mut buf = [0u8; 3];
        reopened.read(3, &mut buf, false).unwrap();
        assert_eq!(&buf, b"abc");
        assert_eq!(fs::read(reopened.path()).unwrap().len(), 64);
    }

    #[test]
    fn test_commit_replaces_file_and_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let mut medium = FileMedium::in_dir(dir.path(), 16);
        medium.init().unwrap();
        medium.write(0, b"first").unwrap();
        medium.commit().unwrap();
        medium.write(0, b"again").unwrap();
        medium.commit().unwrap();

        let on_disk = fs::read(medium.path()).unwrap();
        assert_eq!(&on_disk[..5], b"again");
        assert_eq!(on_disk.len(), 16);
        assert!(!medium.temp_path().exists());
    }

    #[test]
    fn test_bounds_and_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut medium = FileMedium::in_dir(dir.path(), 16);
        assert_eq!(medium.write(0, &[1]), Err(MediumError::Unavailable));

        medium.init().unwrap();
        assert_eq!(medium.write(10, &[0; 7]), Err(MediumError::OutOfBounds));
    }

    #[test]
    fn test_nested_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut medium = FileMedium::new(dir.path().join("a/b/store.bin"), 8);
        medium.init().unwrap();
        medium.write(0, &[7]).unwrap();
        medium.commit().unwrap();
        assert!(dir.path().join("a/b/store.bin").exists());
    }
}
