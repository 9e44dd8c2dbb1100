//! Storage error types
//!
//! Every fallible operation in the storage core returns one of these errors.
//! Corrupt sections and unknown configuration keys are not errors: they are
//! reported as `None` / `Ok(false)` by the operations that encounter them.

use core::fmt;

/// Errors reported by a backing [`Medium`](crate::traits::Medium)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumError {
    /// Backing resource missing or not initialized
    Unavailable,
    /// Access outside of the medium capacity
    OutOfBounds,
    /// Read operation failed
    ReadFailed,
    /// Write operation failed
    WriteFailed,
    /// Erase operation failed
    EraseFailed,
    /// Address or length not aligned to the erase granularity
    Misaligned,
}

impl fmt::Display for MediumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediumError::Unavailable => write!(f, "medium unavailable"),
            MediumError::OutOfBounds => write!(f, "access outside of medium"),
            MediumError::ReadFailed => write!(f, "medium read failed"),
            MediumError::WriteFailed => write!(f, "medium write failed"),
            MediumError::EraseFailed => write!(f, "medium erase failed"),
            MediumError::Misaligned => write!(f, "misaligned erase request"),
        }
    }
}

/// Errors from storage format, state and commit operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Storage runs in memory-only mode (medium failed to initialize)
    Unavailable,
    /// Medium I/O failed
    Medium(MediumError),
    /// Section headers on the medium do not describe a consistent layout
    Layout,
    /// Requested section does not exist
    SectionMissing,
    /// Payload does not fit the declared section size
    SectionTooSmall,
    /// Registered component state does not fit the element state section
    OversizeState {
        /// Bytes claimed by all registered components
        required: usize,
        /// Bytes declared by the section
        available: usize,
    },
    /// Component at this registry index wrote past its declared state size
    ComponentOverrun(usize),
    /// State registry is full
    TooManyComponents,
    /// Not enough space left on the medium for a new section
    NoSpace,
    /// Section table is full
    TooManySections,
    /// Section id is reserved for a built-in section
    ReservedSection(u8),
}

impl From<MediumError> for StorageError {
    fn from(err: MediumError) -> Self {
        StorageError::Medium(err)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "storage unavailable (memory-only mode)"),
            StorageError::Medium(e) => write!(f, "medium error: {}", e),
            StorageError::Layout => write!(f, "inconsistent section layout"),
            StorageError::SectionMissing => write!(f, "section missing"),
            StorageError::SectionTooSmall => write!(f, "payload larger than section"),
            StorageError::OversizeState {
                required,
                available,
            } => write!(
                f,
                "element state needs {} bytes, section holds {}",
                required, available
            ),
            StorageError::ComponentOverrun(index) => {
                write!(f, "state component {} overran its window", index)
            }
            StorageError::TooManyComponents => write!(f, "state registry full"),
            StorageError::NoSpace => write!(f, "no space left on medium"),
            StorageError::TooManySections => write!(f, "section table full"),
            StorageError::ReservedSection(id) => write!(f, "section id {} is reserved", id),
        }
    }
}

/// Errors from config store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Key longer than the maximum key length
    KeyTooLong,
    /// Blob or string value longer than the maximum value length
    ValueTooLong,
    /// Store has no room for another key
    StoreFull,
    /// Serialized config data could not be parsed
    Malformed,
    /// Serialized config does not fit the config section
    Overflow,
    /// Channel number outside of the change flag range
    ChannelOutOfRange,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::KeyTooLong => write!(f, "config key too long"),
            ConfigError::ValueTooLong => write!(f, "config value too long"),
            ConfigError::StoreFull => write!(f, "config store full"),
            ConfigError::Malformed => write!(f, "malformed config data"),
            ConfigError::Overflow => write!(f, "config does not fit its section"),
            ConfigError::ChannelOutOfRange => write!(f, "channel number out of range"),
        }
    }
}
