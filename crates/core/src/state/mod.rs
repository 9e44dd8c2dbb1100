//! Element state persistence
//!
//! - [`cursor`]: little-endian read/write cursors bounded to one component
//! - [`registry`]: ordered component registry and the save/load passes

pub mod cursor;
pub mod registry;

pub use cursor::{StateReader, StateWriter};
pub use registry::{StateComponent, StateRegistry, MAX_COMPONENTS};
