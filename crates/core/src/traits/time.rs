//! Millisecond clock abstraction for commit scheduling.
//!
//! Device clocks are free-running `u32` millisecond counters that wrap after
//! roughly 49.7 days. All elapsed-time arithmetic on them must use wrapping
//! subtraction.

use core::cell::Cell;

/// Platform-agnostic millisecond clock.
///
/// This trait abstracts over different time providers:
/// - `StdTime` / `EmbassyTime` (in the root crate) for real targets
/// - `MockTime` for host testing with controllable time
///
/// # Example
///
/// ```
/// use devstore_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::with_initial(u32::MAX - 10);
/// let start = time.now_ms();
/// time.advance(20);
/// assert_eq!(time.elapsed_since(start), 20);
/// ```
pub trait TimeSource {
    /// Returns the current counter value in milliseconds.
    fn now_ms(&self) -> u32;

    /// Returns milliseconds elapsed since `reference_ms`.
    ///
    /// Uses wrapping subtraction so a counter overflow between the two
    /// readings still yields the right delta.
    fn elapsed_since(&self, reference_ms: u32) -> u32 {
        self.now_ms().wrapping_sub(reference_ms)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Mock clock for testing with controllable time advancement.
#[derive(Debug, Clone, Default)]
pub struct MockTime {
    current_ms: Cell<u32>,
}

impl MockTime {
    /// Creates a new `MockTime` starting at 0 ms.
    pub fn new() -> Self {
        Self {
            current_ms: Cell::new(0),
        }
    }

    /// Creates a new `MockTime` starting at the specified time.
    pub fn with_initial(ms: u32) -> Self {
        Self {
            current_ms: Cell::new(ms),
        }
    }

    /// Sets the counter to an absolute value (may move backwards).
    pub fn set(&self, ms: u32) {
        self.current_ms.set(ms);
    }

    /// Advances the counter, wrapping like the hardware counter does.
    pub fn advance(&self, ms: u32) {
        self.current_ms.set(self.current_ms.get().wrapping_add(ms));
    }
}

impl TimeSource for MockTime {
    fn now_ms(&self) -> u32 {
        self.current_ms.get()
    }
}
