//! Config key-value store
//!
//! Typed values keyed by short strings, kept in RAM and serialized into the
//! config section as a whole.
//!
//! # Section payload
//!
//! ```text
//! entry_count: u16
//! entry_count × { key_len: u8, key[key_len], type_id: u8, value }
//! zero padding
//! ```
//!
//! Blob and string values carry a `u16` length prefix; integers are stored
//! little-endian at their natural width.

use heapless::index_map::FnvIndexMap;
use heapless::{String, Vec};

use super::changes::{ConfigChangeListener, ConfigChanges, MAX_CHANNELS};
use super::keys::{
    generate_key, to_key, ConfigKey, CHANNEL_CHANGE_FLAG_SUFFIX, DEVICE_CHANGE_FLAG_KEY,
    MAX_KEY_LEN,
};
use super::value::{ConfigType, ConfigValue, MAX_VALUE_LEN};
use crate::error::ConfigError;

/// Maximum number of config entries
pub const MAX_CONFIG_ENTRIES: usize = 64;

/// Config key-value store
#[derive(Debug, Clone)]
pub struct ConfigStore {
    entries: FnvIndexMap<ConfigKey, ConfigValue, MAX_CONFIG_ENTRIES>,
    changes: ConfigChanges,
    dirty: bool,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entries: FnvIndexMap::new(),
            changes: ConfigChanges::default(),
            dirty: false,
        }
    }

    /// Get a scalar value
    ///
    /// Returns `None` if the key is unknown or holds another type.
    pub fn get<T: ConfigType>(&self, key: &str) -> Option<T> {
        self.value(key).and_then(T::from_value)
    }

    /// Get the raw stored value
    pub fn value(&self, key: &str) -> Option<&ConfigValue> {
        let key = to_key(key)?;
        self.entries.get(&key)
    }

    /// Copy a blob into `out`
    ///
    /// Returns the blob length, or `None` if the key is unknown, holds another
    /// type or `out` is too small.
    pub fn get_blob(&self, key: &str, out: &mut [u8]) -> Option<usize> {
        match self.value(key)? {
            ConfigValue::Blob(blob) if blob.len() <= out.len() => {
                out[..blob.len()].copy_from_slice(blob);
                Some(blob.len())
            }
            _ => None,
        }
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.value(key)? {
            ConfigValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Set a scalar value
    pub fn set<T: ConfigType>(&mut self, key: &str, value: T) -> Result<(), ConfigError> {
        self.insert(key, value.into_value())
    }

    /// Set a blob value
    pub fn set_blob(&mut self, key: &str, blob: &[u8]) -> Result<(), ConfigError> {
        let value = Vec::from_slice(blob).map_err(|_| ConfigError::ValueTooLong)?;
        self.insert(key, ConfigValue::Blob(value))
    }

    /// Set a string value
    pub fn set_string(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut s = String::new();
        s.push_str(value).map_err(|_| ConfigError::ValueTooLong)?;
        self.insert(key, ConfigValue::Str(s))
    }

    /// Store a value
    ///
    /// Storing a value identical to the current one leaves the store clean.
    pub fn insert(&mut self, key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        let key = to_key(key).ok_or(ConfigError::KeyTooLong)?;
        if self.entries.get(&key) == Some(&value) {
            return Ok(());
        }
        self.entries
            .insert(key, value)
            .map_err(|_| ConfigError::StoreFull)?;
        self.dirty = true;
        Ok(())
    }

    /// Remove a key
    ///
    /// Returns `true` if the key existed.
    pub fn erase_key(&mut self, key: &str) -> bool {
        let Some(key) = to_key(key) else {
            return false;
        };
        if self.entries.remove(&key).is_some() {
            self.dirty = true;
            true
        } else {
            false
        }
    }

    /// Remove every key and pending change
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.dirty = true;
        }
        self.entries.clear();
        self.changes = ConfigChanges::default();
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &ConfigValue)> {
        self.entries.iter()
    }

    /// Check if store has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear dirty flag (called after the config section was written)
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Raise the device config change flag
    pub fn set_device_config_change_flag(&mut self) -> Result<(), ConfigError> {
        self.set::<u8>(DEVICE_CHANGE_FLAG_KEY, 1)?;
        self.changes.device = true;
        Ok(())
    }

    /// Raise the config change flag of one channel
    pub fn set_channel_config_change_flag(&mut self, channel: u8) -> Result<(), ConfigError> {
        if channel >= MAX_CHANNELS {
            return Err(ConfigError::ChannelOutOfRange);
        }
        let key = generate_key(CHANNEL_CHANGE_FLAG_SUFFIX, channel);
        self.set::<u8>(&key, 1)?;
        self.changes.channels |= 1u64 << channel;
        Ok(())
    }

    /// Changes accumulated since the last notification
    pub fn pending_changes(&self) -> ConfigChanges {
        self.changes
    }

    /// Deliver accumulated changes to every listener
    ///
    /// Clears the in-memory and persisted flags and returns what was
    /// delivered. Listeners are not called when nothing changed.
    pub fn notify_changed(&mut self, listeners: &mut [&mut dyn ConfigChangeListener]) -> ConfigChanges {
        let changes = self.changes;
        if changes.is_empty() {
            return changes;
        }

        for listener in listeners.iter_mut() {
            listener.on_config_changed(&changes);
        }

        if changes.device {
            self.erase_key(DEVICE_CHANGE_FLAG_KEY);
        }
        for channel in changes.changed_channels() {
            self.erase_key(&generate_key(CHANNEL_CHANGE_FLAG_SUFFIX, channel));
        }
        self.changes = ConfigChanges::default();
        changes
    }

    /// Serialize every entry into `out`
    ///
    /// The remainder of `out` is zero filled. Returns the number of bytes
    /// used by entries.
    pub fn serialize(&self, out: &mut [u8]) -> Result<usize, ConfigError> {
        let mut pos = 0;
        put(out, &mut pos, &(self.entries.len() as u16).to_le_bytes())?;

        for (key, value) in self.entries.iter() {
            put(out, &mut pos, &[key.len() as u8])?;
            put(out, &mut pos, key.as_bytes())?;
            put(out, &mut pos, &[value.type_id()])?;
            match value {
                ConfigValue::U8(v) => put(out, &mut pos, &[*v])?,
                ConfigValue::I8(v) => put(out, &mut pos, &v.to_le_bytes())?,
                ConfigValue::U32(v) => put(out, &mut pos, &v.to_le_bytes())?,
                ConfigValue::I32(v) => put(out, &mut pos, &v.to_le_bytes())?,
                ConfigValue::Blob(b) => {
                    put(out, &mut pos, &(b.len() as u16).to_le_bytes())?;
                    put(out, &mut pos, b)?;
                }
                ConfigValue::Str(s) => {
                    put(out, &mut pos, &(s.len() as u16).to_le_bytes())?;
                    put(out, &mut pos, s.as_bytes())?;
                }
            }
        }

        out[pos..].fill(0);
        Ok(pos)
    }

    /// Replace the contents with entries parsed from a config section payload
    ///
    /// Persisted change flags are restored into
    /// [`pending_changes`](Self::pending_changes). The store is clean
    /// afterwards. On error the store is left empty.
    pub fn deserialize(&mut self, payload: &[u8]) -> Result<(), ConfigError> {
        self.entries.clear();
        self.changes = ConfigChanges::default();
        self.dirty = false;

        if let Err(e) = self.parse(payload) {
            self.entries.clear();
            return Err(e);
        }

        self.restore_change_flags();
        Ok(())
    }

    fn parse(&mut self, payload: &[u8]) -> Result<(), ConfigError> {
        let mut pos = 0;
        let count = u16::from_le_bytes(take::<2>(payload, &mut pos)?);

        for _ in 0..count {
            let [key_len] = take::<1>(payload, &mut pos)?;
            let key_len = key_len as usize;
            if key_len > MAX_KEY_LEN {
                return Err(ConfigError::Malformed);
            }
            let key_bytes = take_slice(payload, &mut pos, key_len)?;
            let key_str = core::str::from_utf8(key_bytes).map_err(|_| ConfigError::Malformed)?;
            let key = to_key(key_str).ok_or(ConfigError::Malformed)?;

            let [type_id] = take::<1>(payload, &mut pos)?;
            let value = match type_id {
                0 => ConfigValue::U8(take::<1>(payload, &mut pos)?[0]),
                1 => ConfigValue::I8(i8::from_le_bytes(take::<1>(payload, &mut pos)?)),
                2 => ConfigValue::U32(u32::from_le_bytes(take::<4>(payload, &mut pos)?)),
                3 => ConfigValue::I32(i32::from_le_bytes(take::<4>(payload, &mut pos)?)),
                4 | 5 => {
                    let len = u16::from_le_bytes(take::<2>(payload, &mut pos)?) as usize;
                    if len > MAX_VALUE_LEN {
                        return Err(ConfigError::Malformed);
                    }
                    let bytes = take_slice(payload, &mut pos, len)?;
                    if type_id == 4 {
                        ConfigValue::Blob(Vec::from_slice(bytes).map_err(|_| ConfigError::Malformed)?)
                    } else {
                        let s = core::str::from_utf8(bytes).map_err(|_| ConfigError::Malformed)?;
                        let mut value = String::new();
                        value.push_str(s).map_err(|_| ConfigError::Malformed)?;
                        ConfigValue::Str(value)
                    }
                }
                _ => return Err(ConfigError::Malformed),
            };

            self.entries
                .insert(key, value)
                .map_err(|_| ConfigError::StoreFull)?;
        }

        Ok(())
    }

    fn restore_change_flags(&mut self) {
        self.changes.device = self.get::<u8>(DEVICE_CHANGE_FLAG_KEY) == Some(1);
        for channel in 0..MAX_CHANNELS {
            let key = generate_key(CHANNEL_CHANGE_FLAG_SUFFIX, channel);
            if self.get::<u8>(&key) == Some(1) {
                self.changes.channels |= 1u64 << channel;
            }
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn put(out: &mut [u8], pos: &mut usize, bytes: &[u8]) -> Result<(), ConfigError> {
    let end = *pos + bytes.len();
    if end > out.len() {
        return Err(ConfigError::Overflow);
    }
    out[*pos..end].copy_from_slice(bytes);
    *pos = end;
    Ok(())
}

fn take<const N: usize>(buf: &[u8], pos: &mut usize) -> Result<[u8; N], ConfigError> {
    let bytes = take_slice(buf, pos, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

fn take_slice<'b>(buf: &'b [u8], pos: &mut usize, len: usize) -> Result<&'b [u8], ConfigError> {
    let end = *pos + len;
    if end > buf.len() {
        return Err(ConfigError::Malformed);
    }
    let bytes = &buf[*pos..end];
    *pos = end;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        calls: u32,
        last: ConfigChanges,
    }

    impl ConfigChangeListener for Recorder {
        fn on_config_changed(&mut self, changes: &ConfigChanges) {
            self.calls += 1;
            self.last = *changes;
        }
    }

    #[test]
    fn test_store_new() {
        let store = ConfigStore::new();
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_get_set_scalars() {
        let mut store = ConfigStore::new();
        store.set::<u8>("u8", 200).unwrap();
        store.set::<i8>("i8", -5).unwrap();
        store.set::<u32>("u32", 123456).unwrap();
        store.set::<i32>("i32", -123456).unwrap();

        assert_eq!(store.get::<u8>("u8"), Some(200));
        assert_eq!(store.get::<i8>("i8"), Some(-5));
        assert_eq!(store.get::<u32>("u32"), Some(123456));
        assert_eq!(store.get::<i32>("i32"), Some(-123456));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_unknown_key_and_type_mismatch() {
        let mut store = ConfigStore::new();
        store.set::<u32>("port", 2016).unwrap();

        assert_eq!(store.get::<u32>("missing"), None);
        assert_eq!(store.get::<i32>("port"), None);
        assert_eq!(store.get_string("port"), None);
    }

    #[test]
    fn test_identical_set_keeps_store_clean() {
        let mut store = ConfigStore::new();
        store.set_string("name", "lamp").unwrap();
        store.clear_dirty();

        store.set_string("name", "lamp").unwrap();
        assert!(!store.is_dirty());

        store.set_string("name", "lamp2").unwrap();
        assert!(store.is_dirty());
    }

    #[test]
    fn test_blob() {
        let mut store = ConfigStore::new();
        store.set_blob("key", &[1, 2, 3]).unwrap();

        let mut out = [0u8; 8];
        assert_eq!(store.get_blob("key", &mut out), Some(3));
        assert_eq!(&out[..3], &[1, 2, 3]);

        let mut small = [0u8; 2];
        assert_eq!(store.get_blob("key", &mut small), None);
    }

    #[test]
    fn test_limits() {
        let mut store = ConfigStore::new();
        assert_eq!(
            store.set::<u8>("sixteen_chars_xx", 1),
            Err(ConfigError::KeyTooLong)
        );
        assert_eq!(
            store.set_blob("big", &[0u8; MAX_VALUE_LEN + 1]),
            Err(ConfigError::ValueTooLong)
        );

        let mut full = ConfigStore::new();
        for i in 0..MAX_CONFIG_ENTRIES as u8 {
            full.set::<u8>(&generate_key("k", i), i).unwrap();
        }
        assert_eq!(full.set::<u8>("extra", 0), Err(ConfigError::StoreFull));
    }

    #[test]
    fn test_erase_key() {
        let mut store = ConfigStore::new();
        store.set::<u8>("a", 1).unwrap();
        store.clear_dirty();

        assert!(store.erase_key("a"));
        assert!(store.is_dirty());
        assert!(!store.erase_key("a"));
        assert_eq!(store.get::<u8>("a"), None);
    }

    #[test]
    fn test_serialize_layout() {
        let mut store = ConfigStore::new();
        store.set::<u32>("n", 123456).unwrap();

        let mut out = [0xAAu8; 16];
        let used = store.serialize(&mut out).unwrap();

        assert_eq!(used, 9);
        assert_eq!(
            out,
            [1, 0, 1, b'n', 2, 0x40, 0xE2, 0x01, 0x00, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut store = ConfigStore::new();
        store.set::<u8>("a", 1).unwrap();
        store.set::<i8>("b", -1).unwrap();
        store.set::<i32>("c", -70000).unwrap();
        store.set_blob("d", &[9, 8, 7]).unwrap();
        store.set_string("wifissid", "home").unwrap();

        let mut buf = [0u8; 128];
        store.serialize(&mut buf).unwrap();

        let mut restored = ConfigStore::new();
        restored.deserialize(&buf).unwrap();

        assert_eq!(restored.len(), 5);
        assert_eq!(restored.get::<u8>("a"), Some(1));
        assert_eq!(restored.get::<i8>("b"), Some(-1));
        assert_eq!(restored.get::<i32>("c"), Some(-70000));
        assert_eq!(restored.get_string("wifissid"), Some("home"));
        assert!(!restored.is_dirty());
    }

    #[test]
    fn test_serialize_overflow() {
        let mut store = ConfigStore::new();
        store.set_string("s", "too long for the buffer").unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(store.serialize(&mut buf), Err(ConfigError::Overflow));
    }

    #[test]
    fn test_deserialize_blank_payload() {
        let mut store = ConfigStore::new();
        store.deserialize(&[0u8; 32]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_deserialize_malformed() {
        let mut store = ConfigStore::new();
        store.set::<u8>("keep", 1).unwrap();

        // one entry declared, key truncated
        assert_eq!(store.deserialize(&[1, 0, 4, b'a']), Err(ConfigError::Malformed));
        assert!(store.is_empty());

        // unknown type id
        assert_eq!(
            store.deserialize(&[1, 0, 1, b'a', 9, 0]),
            Err(ConfigError::Malformed)
        );
    }

    #[test]
    fn test_change_flags_notify_and_clear() {
        let mut store = ConfigStore::new();
        store.set_device_config_change_flag().unwrap();
        store.set_channel_config_change_flag(3).unwrap();
        assert_eq!(store.get::<u8>("devcfg_chng"), Some(1));
        assert_eq!(store.get::<u8>("3_cfg_chng"), Some(1));

        let mut first = Recorder {
            calls: 0,
            last: ConfigChanges::default(),
        };
        let mut second = Recorder {
            calls: 0,
            last: ConfigChanges::default(),
        };
        let delivered = store.notify_changed(&mut [&mut first, &mut second]);

        assert!(delivered.device);
        assert!(delivered.channel(3));
        assert_eq!(first.calls, 1);
        assert_eq!(second.last, delivered);
        assert!(store.pending_changes().is_empty());
        assert_eq!(store.get::<u8>("devcfg_chng"), None);
        assert_eq!(store.get::<u8>("3_cfg_chng"), None);

        let again = store.notify_changed(&mut [&mut first]);
        assert!(again.is_empty());
        assert_eq!(first.calls, 1);
    }

    #[test]
    fn test_change_flags_survive_reload() {
        let mut store = ConfigStore::new();
        store.set_channel_config_change_flag(5).unwrap();

        let mut buf = [0u8; 64];
        store.serialize(&mut buf).unwrap();

        let mut restored = ConfigStore::new();
        restored.deserialize(&buf).unwrap();
        assert!(restored.pending_changes().channel(5));
        assert!(!restored.pending_changes().device);
    }

    #[test]
    fn test_channel_flag_out_of_range() {
        let mut store = ConfigStore::new();
        assert_eq!(
            store.set_channel_config_change_flag(MAX_CHANNELS),
            Err(ConfigError::ChannelOutOfRange)
        );
    }
}
