//! Device-level config accessors
//!
//! Well-known keys shared by the network, cloud and setup layers.

use super::keys::generate_key;
use super::store::ConfigStore;
use crate::error::ConfigError;

/// Default cloud server port
pub const DEFAULT_SERVER_PORT: i32 = 2016;

/// Maximum Wi-Fi SSID length
pub const MAX_SSID_LEN: usize = 32;

/// Maximum Wi-Fi password length
pub const MAX_WIFI_PASSWORD_LEN: usize = 63;

/// Maximum device name, server host and email length
pub const MAX_NAME_LEN: usize = 127;

const KEY_DEVICE_NAME: &str = "devicename";
const KEY_DEVICE_MODE: &str = "devicemode";
const KEY_WIFI_SSID: &str = "wifissid";
const KEY_WIFI_PASSWORD: &str = "wifipasswd";
const KEY_SERVER: &str = "suplaserver";
const KEY_SERVER_PORT: &str = "suplaport";
const KEY_EMAIL: &str = "email";
const KEY_CLOUD_PROTOCOL: &str = "suplacommproto";
const SUFFIX_CHANNEL_FUNCTION: &str = "fnc";

/// Device operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceMode {
    /// Not configured yet
    #[default]
    NotSet,
    /// Factory test mode
    Test,
    /// Normal operation
    Normal,
    /// Local setup mode
    Config,
    /// Firmware update in progress
    SwUpdate,
}

impl DeviceMode {
    /// Stored representation
    pub fn to_i32(self) -> i32 {
        match self {
            DeviceMode::NotSet => 0,
            DeviceMode::Test => 1,
            DeviceMode::Normal => 2,
            DeviceMode::Config => 3,
            DeviceMode::SwUpdate => 4,
        }
    }

    /// Decode the stored representation (unknown values map to `NotSet`)
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => DeviceMode::Test,
            2 => DeviceMode::Normal,
            3 => DeviceMode::Config,
            4 => DeviceMode::SwUpdate,
            _ => DeviceMode::NotSet,
        }
    }
}

impl ConfigStore {
    fn set_bounded_string(&mut self, key: &str, value: &str, max: usize) -> Result<(), ConfigError> {
        if value.len() > max {
            return Err(ConfigError::ValueTooLong);
        }
        self.set_string(key, value)
    }

    /// Device name
    pub fn device_name(&self) -> Option<&str> {
        self.get_string(KEY_DEVICE_NAME)
    }

    /// Set device name
    pub fn set_device_name(&mut self, name: &str) -> Result<(), ConfigError> {
        self.set_bounded_string(KEY_DEVICE_NAME, name, MAX_NAME_LEN)
    }

    /// Device mode, `NotSet` if missing
    pub fn device_mode(&self) -> DeviceMode {
        self.get::<i32>(KEY_DEVICE_MODE)
            .map(DeviceMode::from_i32)
            .unwrap_or_default()
    }

    /// Set device mode
    pub fn set_device_mode(&mut self, mode: DeviceMode) -> Result<(), ConfigError> {
        self.set::<i32>(KEY_DEVICE_MODE, mode.to_i32())
    }

    /// Wi-Fi SSID
    pub fn wifi_ssid(&self) -> Option<&str> {
        self.get_string(KEY_WIFI_SSID)
    }

    /// Set Wi-Fi SSID
    pub fn set_wifi_ssid(&mut self, ssid: &str) -> Result<(), ConfigError> {
        self.set_bounded_string(KEY_WIFI_SSID, ssid, MAX_SSID_LEN)
    }

    /// Wi-Fi password
    pub fn wifi_password(&self) -> Option<&str> {
        self.get_string(KEY_WIFI_PASSWORD)
    }

    /// Set Wi-Fi password
    pub fn set_wifi_password(&mut self, password: &str) -> Result<(), ConfigError> {
        self.set_bounded_string(KEY_WIFI_PASSWORD, password, MAX_WIFI_PASSWORD_LEN)
    }

    /// Cloud server host
    pub fn server(&self) -> Option<&str> {
        self.get_string(KEY_SERVER)
    }

    /// Set cloud server host
    pub fn set_server(&mut self, server: &str) -> Result<(), ConfigError> {
        self.set_bounded_string(KEY_SERVER, server, MAX_NAME_LEN)
    }

    /// Cloud server port
    ///
    /// `None` if missing or outside `1..=65536`.
    pub fn server_port(&self) -> Option<i32> {
        self.get::<i32>(KEY_SERVER_PORT)
            .filter(|port| (1..=65536).contains(port))
    }

    /// Set cloud server port
    ///
    /// Ports outside `1..=65536` store [`DEFAULT_SERVER_PORT`].
    pub fn set_server_port(&mut self, port: i32) -> Result<(), ConfigError> {
        let port = if (1..=65536).contains(&port) {
            port
        } else {
            DEFAULT_SERVER_PORT
        };
        self.set::<i32>(KEY_SERVER_PORT, port)
    }

    /// Account email
    pub fn email(&self) -> Option<&str> {
        self.get_string(KEY_EMAIL)
    }

    /// Set account email
    pub fn set_email(&mut self, email: &str) -> Result<(), ConfigError> {
        self.set_bounded_string(KEY_EMAIL, email, MAX_NAME_LEN)
    }

    /// Cloud protocol enabled (defaults to enabled)
    pub fn is_cloud_protocol_enabled(&self) -> bool {
        self.get::<i8>(KEY_CLOUD_PROTOCOL).map_or(true, |v| v == 1)
    }

    /// Enable or disable the cloud protocol
    pub fn set_cloud_protocol_enabled(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.set::<i8>(KEY_CLOUD_PROTOCOL, enabled as i8)
    }

    /// Function assigned to a channel
    pub fn channel_function(&self, channel: u8) -> Option<u32> {
        self.get::<u32>(&generate_key(SUFFIX_CHANNEL_FUNCTION, channel))
    }

    /// Assign a function to a channel
    pub fn set_channel_function(&mut self, channel: u8, function: u32) -> Result<(), ConfigError> {
        self.set::<u32>(&generate_key(SUFFIX_CHANNEL_FUNCTION, channel), function)
    }

    /// Check that the device has enough config to go online
    ///
    /// Needs Wi-Fi credentials and, when the cloud protocol is enabled, a
    /// server host and an email.
    pub fn is_minimal_config_ready(&self) -> bool {
        let present = |value: Option<&str>| value.is_some_and(|s| !s.is_empty());

        if !present(self.wifi_ssid()) || !present(self.wifi_password()) {
            return false;
        }
        if self.is_cloud_protocol_enabled() && (!present(self.server()) || !present(self.email())) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_port_defaults() {
        let mut store = ConfigStore::new();
        assert_eq!(store.server_port(), None);

        store.set_server_port(0).unwrap();
        assert_eq!(store.server_port(), Some(DEFAULT_SERVER_PORT));

        store.set_server_port(443).unwrap();
        assert_eq!(store.server_port(), Some(443));

        store.set::<i32>("suplaport", -7).unwrap();
        assert_eq!(store.server_port(), None);
    }

    #[test]
    fn test_device_mode() {
        let mut store = ConfigStore::new();
        assert_eq!(store.device_mode(), DeviceMode::NotSet);

        store.set_device_mode(DeviceMode::Config).unwrap();
        assert_eq!(store.device_mode(), DeviceMode::Config);
        assert_eq!(store.get::<i32>("devicemode"), Some(3));

        store.set::<i32>("devicemode", 42).unwrap();
        assert_eq!(store.device_mode(), DeviceMode::NotSet);
    }

    #[test]
    fn test_string_bounds() {
        let mut store = ConfigStore::new();
        let long_ssid = [b's'; MAX_SSID_LEN + 1];
        let long_ssid = core::str::from_utf8(&long_ssid).unwrap();
        assert_eq!(store.set_wifi_ssid(long_ssid), Err(ConfigError::ValueTooLong));
        store.set_wifi_ssid("home").unwrap();
        assert_eq!(store.wifi_ssid(), Some("home"));
    }

    #[test]
    fn test_channel_function_is_channel_scoped() {
        let mut store = ConfigStore::new();
        store.set_channel_function(1, 140).unwrap();
        store.set_channel_function(2, 90).unwrap();

        assert_eq!(store.channel_function(1), Some(140));
        assert_eq!(store.channel_function(2), Some(90));
        assert_eq!(store.get::<u32>("1_fnc"), Some(140));
        assert_eq!(store.channel_function(3), None);
    }

    #[test]
    fn test_minimal_config_ready() {
        let mut store = ConfigStore::new();
        assert!(!store.is_minimal_config_ready());

        store.set_wifi_ssid("home").unwrap();
        store.set_wifi_password("secret").unwrap();
        assert!(!store.is_minimal_config_ready());

        store.set_cloud_protocol_enabled(false).unwrap();
        assert!(store.is_minimal_config_ready());

        store.set_cloud_protocol_enabled(true).unwrap();
        store.set_server("svr.example.org").unwrap();
        store.set_email("user@example.org").unwrap();
        assert!(store.is_minimal_config_ready());
    }
}
