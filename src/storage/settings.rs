//! Storage runtime settings

/// Default size of the config section in bytes
pub const DEFAULT_CONFIG_SECTION_SIZE: u16 = 1024;

/// Default period between element state saves
pub const DEFAULT_STATE_SAVE_PERIOD_MS: u32 = 1000;

/// Default quiet time before a config change is committed
pub const DEFAULT_CONFIG_SAVE_DELAY_MS: u32 = 2000;

/// Storage runtime settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageSettings {
    /// Offset of the preamble on the medium
    pub base_offset: u32,
    /// Size of the config section, fixed when the section is created
    pub config_section_size: u16,
    /// Period between element state saves (clamped to at least 1 s)
    pub state_save_period_ms: u32,
    /// Debounce delay used by the `config_set*` helpers
    pub config_save_delay_ms: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_offset: 0,
            config_section_size: DEFAULT_CONFIG_SECTION_SIZE,
            state_save_period_ms: DEFAULT_STATE_SAVE_PERIOD_MS,
            config_save_delay_ms: DEFAULT_CONFIG_SAVE_DELAY_MS,
        }
    }
}
