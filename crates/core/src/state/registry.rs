//! Element state registry
//!
//! Components are registered explicitly at startup. Their blobs are laid out
//! back to back in registration order inside the element state section, so
//! the order of `register` calls is part of the on-medium format.

use heapless::Vec;

use super::cursor::{StateReader, StateWriter};
use crate::error::StorageError;
use crate::format::{SectionBuf, SectionKind, MAX_SECTION_SIZE};
use crate::section::SectionStore;

/// Maximum number of registered components
pub const MAX_COMPONENTS: usize = 64;

/// A component that persists a fixed-size state blob
pub trait StateComponent {
    /// Size of the blob in bytes
    ///
    /// Must not change between saves.
    fn state_size(&self) -> usize;

    /// Serialize state into the component's window
    fn save_state(&self, writer: &mut StateWriter<'_>);

    /// Restore state from the component's window
    fn load_state(&mut self, reader: &mut StateReader<'_>);
}

/// Ordered list of state components
pub struct StateRegistry<'a> {
    components: Vec<&'a mut dyn StateComponent, MAX_COMPONENTS>,
    valid: bool,
}

impl<'a> Default for StateRegistry<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> StateRegistry<'a> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            valid: false,
        }
    }

    /// Append a component and return its position
    pub fn register(&mut self, component: &'a mut dyn StateComponent) -> Result<usize, StorageError> {
        let index = self.components.len();
        self.components
            .push(component)
            .map_err(|_| StorageError::TooManyComponents)?;
        Ok(index)
    }

    /// Number of registered components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if no component is registered
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Sum of all component state sizes
    pub fn required_size(&self) -> usize {
        self.components.iter().map(|c| c.state_size()).sum()
    }

    /// Last `load_all` found a valid element state section
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Serialize every component, in order, into the element state section
    ///
    /// The section is created with [`required_size`](Self::required_size)
    /// bytes on first save. If the components no longer fit the declared
    /// section, nothing is written. Returns `Ok(false)` when the stored bytes
    /// already matched.
    pub fn save_all<S: SectionStore + ?Sized>(&mut self, store: &mut S) -> Result<bool, StorageError> {
        if self.components.is_empty() {
            return Ok(false);
        }

        let required = self.required_size();
        if required > MAX_SECTION_SIZE {
            return Err(StorageError::OversizeState {
                required,
                available: MAX_SECTION_SIZE,
            });
        }

        let declared = match store.section_size(SectionKind::ElementState) {
            Some(size) => size as usize,
            None => store.ensure_section(SectionKind::ElementState, required as u16)? as usize,
        };
        if required > declared {
            return Err(StorageError::OversizeState {
                required,
                available: declared,
            });
        }

        let mut buf = SectionBuf::new();
        buf.resize(declared, 0)
            .map_err(|_| StorageError::SectionTooSmall)?;

        let mut cursor = 0;
        for (index, component) in self.components.iter().enumerate() {
            let size = component.state_size();
            let mut writer = StateWriter::new(&mut buf[cursor..cursor + size]);
            component.save_state(&mut writer);
            if writer.overrun() {
                return Err(StorageError::ComponentOverrun(index));
            }
            cursor += size;
        }

        store.write_section(SectionKind::ElementState, &buf)
    }

    /// Deserialize every component, in order, from the element state section
    ///
    /// Returns `Ok(false)` and leaves every component untouched when the
    /// section is absent, fails its CRC check or is smaller than the
    /// registered components need.
    pub fn load_all<S: SectionStore + ?Sized>(&mut self, store: &mut S) -> Result<bool, StorageError> {
        let payload = match store.read_section(SectionKind::ElementState)? {
            Some(payload) => payload,
            None => {
                self.valid = false;
                return Ok(false);
            }
        };

        if payload.len() < self.required_size() {
            self.valid = false;
            return Ok(false);
        }

        let mut cursor = 0;
        for component in self.components.iter_mut() {
            let size = component.state_size();
            let mut reader = StateReader::new(&payload[cursor..cursor + size]);
            component.load_state(&mut reader);
            cursor += size;
        }

        self.valid = true;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::MemorySectionStore;

    struct Counter {
        count: u32,
    }

    impl StateComponent for Counter {
        fn state_size(&self) -> usize {
            4
        }

        fn save_state(&self, writer: &mut StateWriter<'_>) {
            writer.write_u32(self.count);
        }

        fn load_state(&mut self, reader: &mut StateReader<'_>) {
            if let Some(count) = reader.read_u32() {
                self.count = count;
            }
        }
    }

    struct Relay {
        on: bool,
    }

    impl StateComponent for Relay {
        fn state_size(&self) -> usize {
            1
        }

        fn save_state(&self, writer: &mut StateWriter<'_>) {
            writer.write_bool(self.on);
        }

        fn load_state(&mut self, reader: &mut StateReader<'_>) {
            if let Some(on) = reader.read_bool() {
                self.on = on;
            }
        }
    }

    struct Greedy;

    impl StateComponent for Greedy {
        fn state_size(&self) -> usize {
            2
        }

        fn save_state(&self, writer: &mut StateWriter<'_>) {
            writer.write_u32(0xDEAD_BEEF);
        }

        fn load_state(&mut self, _reader: &mut StateReader<'_>) {}
    }

    struct Opaque(usize);

    impl StateComponent for Opaque {
        fn state_size(&self) -> usize {
            self.0
        }

        fn save_state(&self, _writer: &mut StateWriter<'_>) {}

        fn load_state(&mut self, _reader: &mut StateReader<'_>) {}
    }

    #[test]
    fn test_save_lays_out_in_registration_order() {
        let mut store = MemorySectionStore::new();
        let mut counter = Counter { count: 123456 };
        let mut relay = Relay { on: true };

        let mut registry = StateRegistry::new();
        assert_eq!(registry.register(&mut counter), Ok(0));
        assert_eq!(registry.register(&mut relay), Ok(1));
        assert_eq!(registry.required_size(), 5);

        assert_eq!(registry.save_all(&mut store), Ok(true));
        assert_eq!(
            store.raw(SectionKind::ElementState),
            Some(&[0x40, 0xE2, 0x01, 0x00, 0x01][..])
        );
    }

    #[test]
    fn test_second_identical_save_writes_nothing() {
        let mut store = MemorySectionStore::new();
        let mut counter = Counter { count: 7 };

        let mut registry = StateRegistry::new();
        registry.register(&mut counter).unwrap();

        assert_eq!(registry.save_all(&mut store), Ok(true));
        assert_eq!(registry.save_all(&mut store), Ok(false));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_round_trip() {
        let mut store = MemorySectionStore::new();
        {
            let mut counter = Counter { count: 99 };
            let mut relay = Relay { on: true };
            let mut registry = StateRegistry::new();
            registry.register(&mut counter).unwrap();
            registry.register(&mut relay).unwrap();
            registry.save_all(&mut store).unwrap();
        }

        let mut counter = Counter { count: 0 };
        let mut relay = Relay { on: false };
        {
            let mut registry = StateRegistry::new();
            registry.register(&mut counter).unwrap();
            registry.register(&mut relay).unwrap();
            assert_eq!(registry.load_all(&mut store), Ok(true));
            assert!(registry.is_valid());
        }
        assert_eq!(counter.count, 99);
        assert!(relay.on);
    }

    #[test]
    fn test_corrupt_section_keeps_defaults() {
        let mut store = MemorySectionStore::new();
        {
            let mut counter = Counter { count: 99 };
            let mut registry = StateRegistry::new();
            registry.register(&mut counter).unwrap();
            registry.save_all(&mut store).unwrap();
        }
        store.corrupt(SectionKind::ElementState);

        let mut counter = Counter { count: 5 };
        {
            let mut registry = StateRegistry::new();
            registry.register(&mut counter).unwrap();
            assert_eq!(registry.load_all(&mut store), Ok(false));
            assert!(!registry.is_valid());
        }
        assert_eq!(counter.count, 5);
    }

    #[test]
    fn test_oversize_state_writes_nothing() {
        let mut store = MemorySectionStore::new();
        store.ensure_section(SectionKind::ElementState, 4).unwrap();

        let mut counter = Counter { count: 1 };
        let mut relay = Relay { on: true };
        let mut registry = StateRegistry::new();
        registry.register(&mut counter).unwrap();
        registry.register(&mut relay).unwrap();

        assert_eq!(
            registry.save_all(&mut store),
            Err(StorageError::OversizeState {
                required: 5,
                available: 4
            })
        );
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.raw(SectionKind::ElementState), Some(&[0u8; 4][..]));
    }

    #[test]
    fn test_state_beyond_section_limit_is_rejected() {
        let mut store = MemorySectionStore::new();
        let mut big = Opaque(MAX_SECTION_SIZE + 1);
        let mut registry = StateRegistry::new();
        registry.register(&mut big).unwrap();

        assert!(matches!(
            registry.save_all(&mut store),
            Err(StorageError::OversizeState { .. })
        ));
        assert_eq!(store.section_size(SectionKind::ElementState), None);
    }

    #[test]
    fn test_component_overrun_is_reported() {
        let mut store = MemorySectionStore::new();
        let mut counter = Counter { count: 1 };
        let mut greedy = Greedy;
        let mut registry = StateRegistry::new();
        registry.register(&mut counter).unwrap();
        registry.register(&mut greedy).unwrap();

        assert_eq!(
            registry.save_all(&mut store),
            Err(StorageError::ComponentOverrun(1))
        );
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_smaller_section_than_required_is_not_loaded() {
        let mut store = MemorySectionStore::new();
        store.ensure_section(SectionKind::ElementState, 2).unwrap();

        let mut counter = Counter { count: 3 };
        {
            let mut registry = StateRegistry::new();
            registry.register(&mut counter).unwrap();
            assert_eq!(registry.load_all(&mut store), Ok(false));
        }
        assert_eq!(counter.count, 3);
    }

    #[test]
    fn test_empty_registry_saves_nothing() {
        let mut store = MemorySectionStore::new();
        let mut registry = StateRegistry::new();
        assert_eq!(registry.save_all(&mut store), Ok(false));
        assert_eq!(store.section_size(SectionKind::ElementState), None);
    }
}
