//! Platform abstraction traits
//!
//! Driver interfaces that media backends are built on.

pub mod eeprom;
pub mod flash;

pub use eeprom::EepromInterface;
pub use flash::FlashInterface;
