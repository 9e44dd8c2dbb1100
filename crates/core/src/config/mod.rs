//! Typed key-value configuration
//!
//! - [`value`]: stored value types
//! - [`keys`]: key type and channel-scoped key generation
//! - [`store`]: the in-RAM map and its section encoding
//! - [`changes`]: change flags and listeners
//! - [`device`]: accessors for well-known device keys

pub mod changes;
pub mod device;
pub mod keys;
pub mod store;
pub mod value;

pub use changes::{ConfigChangeListener, ConfigChanges, MAX_CHANNELS};
pub use device::DeviceMode;
pub use keys::{generate_key, ConfigKey, MAX_KEY_LEN};
pub use store::{ConfigStore, MAX_CONFIG_ENTRIES};
pub use value::{ConfigType, ConfigValue, MAX_VALUE_LEN};
