//! Storage media
//!
//! [`Medium`](devstore_core::traits::Medium) implementations over platform
//! drivers:
//!
//! - [`EepromMedium`]: byte-granular EEPROM emulation
//! - [`SectorFlashMedium`]: NOR flash partition with a RAM shadow
//! - [`FileMedium`]: whole-file image on a host filesystem (`std` feature)

pub mod eeprom;
pub mod flash;

#[cfg(any(test, feature = "std"))]
pub mod file;

pub use eeprom::EepromMedium;
pub use flash::SectorFlashMedium;

#[cfg(any(test, feature = "std"))]
pub use file::FileMedium;
