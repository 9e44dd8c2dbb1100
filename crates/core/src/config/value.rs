//! Typed config values

use heapless::{String, Vec};

/// Maximum length of a blob or string value
pub const MAX_VALUE_LEN: usize = 128;

/// A stored config value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    /// Unsigned 8-bit integer
    U8(u8),
    /// Signed 8-bit integer
    I8(i8),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Signed 32-bit integer
    I32(i32),
    /// Opaque bytes
    Blob(Vec<u8, MAX_VALUE_LEN>),
    /// UTF-8 string
    Str(String<MAX_VALUE_LEN>),
}

impl ConfigValue {
    /// Get type discriminant for serialization
    pub fn type_id(&self) -> u8 {
        match self {
            ConfigValue::U8(_) => 0,
            ConfigValue::I8(_) => 1,
            ConfigValue::U32(_) => 2,
            ConfigValue::I32(_) => 3,
            ConfigValue::Blob(_) => 4,
            ConfigValue::Str(_) => 5,
        }
    }
}

/// Scalar types readable and writable through [`ConfigStore::get`] and
/// [`ConfigStore::set`]
///
/// [`ConfigStore::get`]: super::ConfigStore::get
/// [`ConfigStore::set`]: super::ConfigStore::set
pub trait ConfigType: Copy {
    /// Extract from a stored value of the matching type
    fn from_value(value: &ConfigValue) -> Option<Self>;

    /// Wrap into a stored value
    fn into_value(self) -> ConfigValue;
}

macro_rules! config_type {
    ($ty:ty, $variant:ident) => {
        impl ConfigType for $ty {
            fn from_value(value: &ConfigValue) -> Option<Self> {
                match value {
                    ConfigValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            fn into_value(self) -> ConfigValue {
                ConfigValue::$variant(self)
            }
        }
    };
}

config_type!(u8, U8);
config_type!(i8, I8);
config_type!(u32, U32);
config_type!(i32, I32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_is_none() {
        let value = 7u8.into_value();
        assert_eq!(u8::from_value(&value), Some(7));
        assert_eq!(i8::from_value(&value), None);
        assert_eq!(u32::from_value(&value), None);
    }

    #[test]
    fn test_type_ids() {
        assert_eq!(ConfigValue::U8(0).type_id(), 0);
        assert_eq!(ConfigValue::I8(0).type_id(), 1);
        assert_eq!(ConfigValue::U32(0).type_id(), 2);
        assert_eq!(ConfigValue::I32(0).type_id(), 3);
        assert_eq!(ConfigValue::Blob(Vec::new()).type_id(), 4);
        assert_eq!(ConfigValue::Str(String::new()).type_id(), 5);
    }
}
