//! Platform error types
//!
//! Driver errors reported by flash and EEPROM interfaces. Media backends map
//! them onto [`MediumError`] so the storage layer sees a single error type.

use core::fmt;

use devstore_core::error::MediumError;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
///
/// All platform implementations map their HAL-specific errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    /// Flash operation failed
    Flash(FlashError),
    /// EEPROM operation failed
    Eeprom(EepromError),
    /// Platform initialization failed
    InitializationFailed,
    /// Resource not available
    ResourceUnavailable,
}

/// Flash-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    /// Erase operation failed
    EraseFailed,
    /// Write operation failed
    WriteFailed,
    /// Read operation failed
    ReadFailed,
    /// Invalid address (out of bounds)
    InvalidAddress,
    /// Address or size not aligned to the erase block
    Unaligned,
    /// Flash is busy
    Busy,
}

/// EEPROM emulation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EepromError {
    /// `begin` was not called or failed
    NotStarted,
    /// Requested size exceeds the emulated EEPROM
    TooLarge,
    /// Access outside of the started size
    InvalidAddress,
    /// Commit to the backing flash failed
    CommitFailed,
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Flash(e) => write!(f, "Flash error: {:?}", e),
            PlatformError::Eeprom(e) => write!(f, "EEPROM error: {:?}", e),
            PlatformError::InitializationFailed => write!(f, "Platform initialization failed"),
            PlatformError::ResourceUnavailable => write!(f, "Resource not available"),
        }
    }
}

impl From<FlashError> for PlatformError {
    fn from(error: FlashError) -> Self {
        PlatformError::Flash(error)
    }
}

impl From<EepromError> for PlatformError {
    fn from(error: EepromError) -> Self {
        PlatformError::Eeprom(error)
    }
}

impl From<FlashError> for MediumError {
    fn from(error: FlashError) -> Self {
        match error {
            FlashError::EraseFailed => MediumError::EraseFailed,
            FlashError::WriteFailed | FlashError::Busy => MediumError::WriteFailed,
            FlashError::ReadFailed => MediumError::ReadFailed,
            FlashError::InvalidAddress => MediumError::OutOfBounds,
            FlashError::Unaligned => MediumError::Misaligned,
        }
    }
}

impl From<EepromError> for MediumError {
    fn from(error: EepromError) -> Self {
        match error {
            EepromError::NotStarted | EepromError::TooLarge => MediumError::Unavailable,
            EepromError::InvalidAddress => MediumError::OutOfBounds,
            EepromError::CommitFailed => MediumError::WriteFailed,
        }
    }
}

impl From<PlatformError> for MediumError {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::Flash(e) => e.into(),
            PlatformError::Eeprom(e) => e.into(),
            PlatformError::InitializationFailed | PlatformError::ResourceUnavailable => {
                MediumError::Unavailable
            }
        }
    }
}
