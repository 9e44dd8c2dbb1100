//! Ambient infrastructure
//!
//! Logging macros and the storage event telemetry buffer.

pub mod logging;
pub mod telemetry;
