#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! devstore - Persistent storage for embedded device SDKs
//!
//! This library drives the storage format from `devstore_core` over concrete
//! media: EEPROM emulation, NOR flash partitions and (on host) plain files.
//! It owns element state persistence, the typed config store and the commit
//! scheduling that keeps flash wear down.

// Platform abstraction layer: drivers, media, clocks
pub mod platform;

// Ambient infrastructure: logging, telemetry
pub mod core;

// Format codec and the storage runtime
pub mod storage;

pub use devstore_core::config::{ConfigChangeListener, ConfigChanges, ConfigStore};
pub use devstore_core::error::{ConfigError, MediumError, StorageError};
pub use devstore_core::state::{StateComponent, StateReader, StateRegistry, StateWriter};
pub use storage::{Mount, Storage, StorageSettings};
