//! devstore_core - Pure no_std logic for the device storage engine
//!
//! This crate contains the on-medium format, the state registry, the config
//! store and the commit scheduler. Everything here can be tested on host
//! without any feature flags or hardware.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **Trait abstractions**: Media and clocks injected via traits
//!
//! # Modules
//!
//! - [`traits`]: Platform-agnostic trait abstractions (Medium, TimeSource)
//! - [`crc`]: CRC16 used by section headers
//! - [`format`]: Preamble, section header and section table types
//! - [`section`]: Section access seam used by the state and config layers
//! - [`state`]: Element state registry and component cursors
//! - [`config`]: Typed key-value config store
//! - [`scheduler`]: Commit scheduling
//! - [`error`]: Error types

#![no_std]

pub mod config;
pub mod crc;
pub mod error;
pub mod format;
pub mod scheduler;
pub mod section;
pub mod state;
pub mod traits;

pub use error::{ConfigError, MediumError, StorageError};
