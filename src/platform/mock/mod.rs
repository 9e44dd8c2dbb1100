//! Mock media and drivers for testing
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled
//!
//! # Example
//!
//! ```
//! use devstore::platform::mock::MockMedium;
//! use devstore_core::traits::Medium;
//!
//! let mut medium = MockMedium::new(256);
//! medium.init().unwrap();
//! medium.write(0, b"SUPLA").unwrap();
//! medium.commit().unwrap();
//! assert_eq!(medium.commit_count(), 1);
//! ```

#![cfg(any(test, feature = "mock"))]

pub mod eeprom;
pub mod flash;
pub mod medium;

pub use eeprom::MockEeprom;
pub use flash::MockFlash;
pub use medium::MockMedium;
