//! Storage runtime
//!
//! [`Storage`] ties a [`FormatCodec`] to the config store and the commit
//! scheduler. The application owns the [`StateRegistry`] and passes it in
//! for state passes, so the registration order stays visible at the call
//! site.
//!
//! # Example
//!
//! ```
//! use devstore::platform::mock::MockMedium;
//! use devstore::storage::{Mount, Storage, StorageSettings};
//! use devstore_core::state::StateRegistry;
//! use devstore_core::traits::MockTime;
//!
//! let time = MockTime::new();
//! let mut storage = Storage::new(MockMedium::new(4096), &time, StorageSettings::default());
//! assert_eq!(storage.init().unwrap(), Mount::Fresh);
//!
//! storage.config_set::<u32>("counter", 7).unwrap();
//! storage.commit_config().unwrap();
//!
//! let mut registry = StateRegistry::new();
//! assert_eq!(storage.load_state(&mut registry), Ok(false));
//! ```

pub mod codec;
#[cfg(feature = "embassy")]
pub mod runner;
pub mod settings;

pub use codec::{FormatCodec, Mount, StorageStats};
pub use settings::StorageSettings;

use devstore_core::config::{ConfigChangeListener, ConfigChanges, ConfigStore, ConfigType};
use devstore_core::error::{ConfigError, StorageError};
use devstore_core::format::{SectionBuf, SectionKind, MAX_SECTION_SIZE};
use devstore_core::scheduler::{CommitKind, CommitScheduler};
use devstore_core::section::SectionStore;
use devstore_core::state::StateRegistry;
use devstore_core::traits::{Medium, TimeSource};

use crate::core::telemetry::{EventKind, TelemetryBuffer};

/// Persistent storage runtime
pub struct Storage<M: Medium, T: TimeSource> {
    codec: FormatCodec<M>,
    time: T,
    settings: StorageSettings,
    config: ConfigStore,
    scheduler: CommitScheduler,
    available: bool,
    telemetry: Option<&'static TelemetryBuffer>,
}

impl<M: Medium, T: TimeSource> Storage<M, T> {
    /// Create a storage runtime; nothing touches the medium until `init`
    pub fn new(medium: M, time: T, settings: StorageSettings) -> Self {
        let scheduler = CommitScheduler::new(time.now_ms(), settings.state_save_period_ms);
        Self {
            codec: FormatCodec::new(medium, settings.base_offset),
            time,
            settings,
            config: ConfigStore::new(),
            scheduler,
            available: false,
            telemetry: None,
        }
    }

    /// Record storage events into `buffer`
    pub fn with_telemetry(mut self, buffer: &'static TelemetryBuffer) -> Self {
        self.telemetry = Some(buffer);
        self
    }

    /// Attach the medium, repair the layout if needed and load the config
    ///
    /// A medium that fails to initialize or mount is not an error: the
    /// runtime switches to memory-only mode and reports [`Mount::MemoryOnly`].
    pub fn init(&mut self) -> Result<Mount, StorageError> {
        if self.codec.medium_mut().init().is_err() {
            crate::log_warn!("Storage medium unavailable, running memory-only");
            self.available = false;
            self.record(EventKind::Degraded, 0);
            return Ok(Mount::MemoryOnly);
        }

        let mount = match self.codec.mount() {
            Ok(mount) => mount,
            Err(_) => {
                crate::log_warn!("Storage mount failed, running memory-only");
                self.available = false;
                self.record(EventKind::Degraded, 0);
                return Ok(Mount::MemoryOnly);
            }
        };
        self.available = true;
        match mount {
            Mount::Fresh => self.record(EventKind::Initialized, 0),
            Mount::Repaired => self.record(EventKind::Repaired, 0),
            Mount::Existing(_) | Mount::MemoryOnly => {}
        }

        self.load_config()?;
        Ok(mount)
    }

    /// Medium attached (not memory-only)
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Runtime settings
    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Codec I/O counters
    pub fn stats(&self) -> StorageStats {
        self.codec.stats()
    }

    /// Access the codec
    pub fn codec(&self) -> &FormatCodec<M> {
        &self.codec
    }

    /// Access the medium
    pub fn medium(&self) -> &M {
        self.codec.medium()
    }

    /// Mutable access to the medium
    pub fn medium_mut(&mut self) -> &mut M {
        self.codec.medium_mut()
    }

    /// Release the medium
    pub fn into_medium(self) -> M {
        self.codec.into_inner()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }

    fn record(&self, kind: EventKind, detail: u32) {
        if let Some(buffer) = self.telemetry {
            buffer.record(kind, self.time.now_ms(), detail);
        }
    }

    /// Run a section read, recording a telemetry event on CRC failure
    fn read_checked(&mut self, kind: SectionKind) -> Result<Option<SectionBuf>, StorageError> {
        let failures = self.codec.stats().crc_failures;
        let payload = self.codec.read_section(kind)?;
        if self.codec.stats().crc_failures != failures {
            self.record(EventKind::CrcFailure, kind.to_u8() as u32);
        }
        Ok(payload)
    }

    fn commit(&mut self) -> Result<bool, StorageError> {
        let committed = self.codec.commit()?;
        if committed {
            self.record(EventKind::Commit, self.codec.stats().commits);
        }
        Ok(committed)
    }

    // ---- element state ----

    /// Restore every registered component from the element state section
    ///
    /// Returns `Ok(false)` when the section is absent or corrupt; components
    /// then keep their defaults.
    pub fn load_state(&mut self, registry: &mut StateRegistry<'_>) -> Result<bool, StorageError> {
        self.check_available()?;
        let failures = self.codec.stats().crc_failures;
        let loaded = registry.load_all(&mut self.codec)?;
        if self.codec.stats().crc_failures != failures {
            self.record(EventKind::CrcFailure, SectionKind::ElementState.to_u8() as u32);
        }
        Ok(loaded)
    }

    /// Save every registered component and commit
    ///
    /// Returns `Ok(false)` when the stored state already matched; nothing is
    /// written or committed in that case.
    pub fn save_state(&mut self, registry: &mut StateRegistry<'_>) -> Result<bool, StorageError> {
        self.check_available()?;
        let changed = registry.save_all(&mut self.codec)?;
        self.commit()?;
        Ok(changed)
    }

    // ---- config ----

    /// Config store
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Config store (mutable); call [`save_with_delay`](Self::save_with_delay)
    /// after changing it
    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    fn schedule_if_dirty(&mut self) {
        if self.config.is_dirty() {
            self.save_with_delay(self.settings.config_save_delay_ms);
        }
    }

    /// Set a config value and schedule a debounced commit
    pub fn config_set<V: ConfigType>(&mut self, key: &str, value: V) -> Result<(), ConfigError> {
        self.config.set(key, value)?;
        self.schedule_if_dirty();
        Ok(())
    }

    /// Set a blob config value and schedule a debounced commit
    pub fn config_set_blob(&mut self, key: &str, blob: &[u8]) -> Result<(), ConfigError> {
        self.config.set_blob(key, blob)?;
        self.schedule_if_dirty();
        Ok(())
    }

    /// Set a string config value and schedule a debounced commit
    pub fn config_set_string(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.config.set_string(key, value)?;
        self.schedule_if_dirty();
        Ok(())
    }

    /// Remove a config key and schedule a debounced commit
    pub fn config_erase(&mut self, key: &str) -> bool {
        let erased = self.config.erase_key(key);
        self.schedule_if_dirty();
        erased
    }

    /// Commit the config `delay_ms` from now, or later if changed again
    pub fn save_with_delay(&mut self, delay_ms: u32) {
        self.scheduler.save_with_delay(self.time.now_ms(), delay_ms);
    }

    /// Raise the device config change flag and schedule a commit
    pub fn set_device_config_change_flag(&mut self) -> Result<(), ConfigError> {
        self.config.set_device_config_change_flag()?;
        self.schedule_if_dirty();
        Ok(())
    }

    /// Raise the config change flag of one channel and schedule a commit
    pub fn set_channel_config_change_flag(&mut self, channel: u8) -> Result<(), ConfigError> {
        self.config.set_channel_config_change_flag(channel)?;
        self.schedule_if_dirty();
        Ok(())
    }

    /// Deliver pending config changes to `listeners`
    ///
    /// The persisted flags are cleared and the cleared store is scheduled
    /// for a commit.
    pub fn notify_config_changed(
        &mut self,
        listeners: &mut [&mut dyn ConfigChangeListener],
    ) -> ConfigChanges {
        let changes = self.config.notify_changed(listeners);
        self.schedule_if_dirty();
        changes
    }

    /// Write the config section now and commit, bypassing the debounce
    pub fn commit_config(&mut self) -> Result<bool, StorageError> {
        self.check_available()?;

        let size = self
            .codec
            .ensure_section(SectionKind::DeviceConfig, self.settings.config_section_size)?;
        let mut buf = SectionBuf::new();
        buf.resize(size as usize, 0)
            .map_err(|_| StorageError::SectionTooSmall)?;
        self.config.serialize(&mut buf).map_err(|_| {
            crate::log_error!("Config does not fit its {} byte section", size);
            StorageError::SectionTooSmall
        })?;

        let changed = self.codec.write_section(SectionKind::DeviceConfig, &buf)?;
        self.commit()?;
        self.config.clear_dirty();
        self.scheduler.cancel_config();
        Ok(changed)
    }

    fn load_config(&mut self) -> Result<(), StorageError> {
        let payload = match self.read_checked(SectionKind::DeviceConfig)? {
            Some(payload) => payload,
            None => return Ok(()),
        };

        if self.config.deserialize(&payload).is_err() {
            crate::log_warn!("Config section malformed, starting empty");
        } else {
            crate::log_info!("Loaded {} config entries", self.config.len());
        }
        Ok(())
    }

    // ---- scheduling ----

    /// Change the periodic state save interval (at least 1 s)
    pub fn set_state_save_period(&mut self, period_ms: u32) {
        self.scheduler.set_state_period(self.time.now_ms(), period_ms);
    }

    /// Save state within `delay_ms` unless a save is due sooner anyway
    pub fn schedule_state_save(&mut self, delay_ms: u32) {
        self.scheduler.schedule_state_save(self.time.now_ms(), delay_ms);
    }

    /// A debounced config commit is armed
    pub fn config_commit_pending(&self) -> bool {
        self.scheduler.config_pending()
    }

    /// Number of clock anomalies the scheduler absorbed
    pub fn clock_anomalies(&self) -> u32 {
        self.scheduler.clock_anomalies()
    }

    /// Run whatever commits are due now
    ///
    /// Call this from the device main loop. Returns the commits that were
    /// due. In memory-only mode the timers still run but nothing is written.
    ///
    /// A failing commit does not stop the other one; the first error is
    /// returned and a failed config commit is scheduled again.
    pub fn iterate(&mut self, registry: &mut StateRegistry<'_>) -> Result<CommitKind, StorageError> {
        let anomalies = self.scheduler.clock_anomalies();
        let due = self.scheduler.tick(self.time.now_ms());
        if self.scheduler.clock_anomalies() != anomalies {
            crate::log_warn!("Clock anomaly, commit timers restarted");
            self.record(EventKind::ClockAnomaly, self.scheduler.clock_anomalies());
        }

        if !self.available {
            return Ok(due);
        }

        let mut first_error = None;
        if due.contains(CommitKind::CONFIG) {
            if let Err(e) = self.commit_config() {
                crate::log_error!("Config commit failed, retrying later");
                self.save_with_delay(self.settings.config_save_delay_ms);
                first_error = Some(e);
            }
        }
        if due.contains(CommitKind::STATE) {
            if let Err(e) = self.save_state(registry) {
                crate::log_error!("State save failed");
                first_error = first_error.or(Some(e));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(due),
        }
    }

    // ---- custom sections ----

    /// Write an application section and commit
    ///
    /// The section is created with the payload length on first write and
    /// keeps that size. Ids 0 to 3 are reserved.
    pub fn write_custom(&mut self, id: u8, payload: &[u8]) -> Result<bool, StorageError> {
        let kind = SectionKind::custom(id).ok_or(StorageError::ReservedSection(id))?;
        self.check_available()?;
        if payload.len() > MAX_SECTION_SIZE {
            return Err(StorageError::SectionTooSmall);
        }

        self.codec.ensure_section(kind, payload.len() as u16)?;
        let changed = self.codec.write_section(kind, payload)?;
        self.commit()?;
        Ok(changed)
    }

    /// Read an application section
    ///
    /// Returns `Ok(None)` when the section is absent or corrupt.
    pub fn read_custom(&mut self, id: u8) -> Result<Option<SectionBuf>, StorageError> {
        let kind = SectionKind::custom(id).ok_or(StorageError::ReservedSection(id))?;
        self.check_available()?;
        self.read_checked(kind)
    }

    /// Erase the whole store
    ///
    /// The in-memory config is kept; the next init sees a blank medium.
    pub fn delete_all(&mut self) -> Result<(), StorageError> {
        self.check_available()?;
        self.codec.delete_all()?;
        self.record(EventKind::Commit, self.codec.stats().commits);
        Ok(())
    }
}
