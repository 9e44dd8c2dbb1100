//! Config key construction

use core::fmt::Write;

use heapless::String;

/// Maximum key length in bytes
pub const MAX_KEY_LEN: usize = 15;

/// A config key
pub type ConfigKey = String<MAX_KEY_LEN>;

/// Key holding the persisted device config change flag
pub const DEVICE_CHANGE_FLAG_KEY: &str = "devcfg_chng";

/// Suffix of the per-channel config change flag key
pub const CHANNEL_CHANGE_FLAG_SUFFIX: &str = "cfg_chng";

/// Build a channel-scoped key `"{channel}_{suffix}"`
///
/// Keys longer than [`MAX_KEY_LEN`] are truncated, so two long suffixes can
/// collide on the same key.
pub fn generate_key(suffix: &str, channel: u8) -> ConfigKey {
    let mut full: String<32> = String::new();
    // u8 plus separator always fits
    let _ = write!(full, "{}_", channel);

    let mut key = ConfigKey::new();
    for c in full.chars().chain(suffix.chars()) {
        if key.push(c).is_err() {
            break;
        }
    }
    key
}

/// Convert a plain key, rejecting keys that are too long
pub fn to_key(name: &str) -> Option<ConfigKey> {
    let mut key = ConfigKey::new();
    key.push_str(name).ok()?;
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        assert_eq!(generate_key("fnc", 3).as_str(), "3_fnc");
        assert_eq!(generate_key("cfg_chng", 12).as_str(), "12_cfg_chng");
        assert_eq!(generate_key("fnc", 3), generate_key("fnc", 3));
    }

    #[test]
    fn test_generate_key_scopes_channels() {
        assert_ne!(generate_key("fnc", 1), generate_key("fnc", 2));
    }

    #[test]
    fn test_generate_key_truncates() {
        let key = generate_key("a_very_long_suffix", 200);
        assert_eq!(key.len(), MAX_KEY_LEN);
        assert_eq!(key.as_str(), "200_a_very_long");
    }

    #[test]
    fn test_to_key() {
        assert_eq!(to_key("wifissid").as_deref(), Some("wifissid"));
        assert_eq!(to_key("sixteen_chars_xx"), None);
    }
}
