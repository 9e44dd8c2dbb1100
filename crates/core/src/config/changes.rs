//! Config change tracking
//!
//! Changes made by the cloud or the local UI raise a device flag or a
//! per-channel flag. The flags are persisted in the config map so a change
//! made right before a reset is still reported after reboot.

/// Number of channels tracked by change flags
pub const MAX_CHANNELS: u8 = 64;

/// Accumulated config changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigChanges {
    /// Device-level config changed
    pub device: bool,
    /// Bit `n` set when channel `n` config changed
    pub channels: u64,
}

impl ConfigChanges {
    /// No change pending
    pub fn is_empty(&self) -> bool {
        !self.device && self.channels == 0
    }

    /// Check a channel flag
    pub fn channel(&self, channel: u8) -> bool {
        channel < MAX_CHANNELS && self.channels & (1u64 << channel) != 0
    }

    /// Iterate over changed channel numbers in ascending order
    pub fn changed_channels(&self) -> impl Iterator<Item = u8> + '_ {
        (0..MAX_CHANNELS).filter(move |&ch| self.channel(ch))
    }
}

/// Receiver of config change notifications
pub trait ConfigChangeListener {
    /// Called once per notification with every change accumulated since the
    /// previous one
    fn on_config_changed(&mut self, changes: &ConfigChanges);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_channels() {
        let changes = ConfigChanges {
            device: false,
            channels: (1 << 2) | (1 << 63),
        };
        let mut channels = changes.changed_channels();
        assert_eq!(channels.next(), Some(2));
        assert_eq!(channels.next(), Some(63));
        assert_eq!(channels.next(), None);
        assert!(!changes.is_empty());
        assert!(!changes.channel(64));
    }
}
