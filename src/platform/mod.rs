//! Platform abstraction layer
//!
//! Driver traits, the media built on them, and clocks. All hardware-specific
//! code stays in this module.

pub mod error;
pub mod media;
pub mod time;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{EepromError, FlashError, PlatformError, Result};
pub use traits::{EepromInterface, FlashInterface};
