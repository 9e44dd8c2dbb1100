//! Platform seams of the storage core.
//!
//! - Trait definitions are pure and have no feature gates
//! - Mock implementations of the clock are always available for host testing
//! - Concrete media and clocks live in the root crate

pub mod medium;
pub mod time;

pub use medium::{EraseMode, Medium};
pub use time::{MockTime, TimeSource};
