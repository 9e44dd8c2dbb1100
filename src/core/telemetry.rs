//! Storage event telemetry
//!
//! A fixed-capacity ring of storage events that can be read from any
//! context. Every access goes through `critical_section::with`, so the
//! buffer can be shared with interrupt handlers and other tasks.
//!
//! ## Features
//!
//! - Fixed capacity of 32 events
//! - Automatic oldest event eviction when full
//! - Overflow tracking for diagnostics
//! - Oldest-first draining

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{HistoryBuf, Vec};

/// Buffer capacity in number of events
pub const TELEMETRY_BUFFER_SIZE: usize = 32;

/// Kind of storage event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// Blank medium initialized
    Initialized,
    /// Foreign or damaged layout rewritten
    Repaired,
    /// Section failed its CRC check (detail: section type byte)
    CrcFailure,
    /// Medium commit completed (detail: commit count)
    Commit,
    /// Medium unavailable, running memory-only
    Degraded,
    /// Scheduler saw an implausible clock (detail: anomaly count)
    ClockAnomaly,
}

/// A recorded storage event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageEvent {
    /// What happened
    pub kind: EventKind,
    /// Clock value when it happened
    pub timestamp_ms: u32,
    /// Event specific value
    pub detail: u32,
}

struct Inner {
    events: HistoryBuf<StorageEvent, TELEMETRY_BUFFER_SIZE>,
    overflow_count: u32,
}

/// Interrupt-safe ring buffer of storage events
pub struct TelemetryBuffer {
    inner: Mutex<RefCell<Inner>>,
}

impl TelemetryBuffer {
    /// Create a new empty buffer
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                events: HistoryBuf::new(),
                overflow_count: 0,
            })),
        }
    }

    /// Record an event, evicting the oldest one when full
    pub fn record(&self, kind: EventKind, timestamp_ms: u32, detail: u32) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.events.len() == TELEMETRY_BUFFER_SIZE {
                inner.overflow_count = inner.overflow_count.saturating_add(1);
            }
            inner.events.write(StorageEvent {
                kind,
                timestamp_ms,
                detail,
            });
        });
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).events.len())
    }

    /// Check if no event is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events lost to eviction
    pub fn overflow_count(&self) -> u32 {
        critical_section::with(|cs| self.inner.borrow_ref(cs).overflow_count)
    }

    /// Most recent event
    pub fn latest(&self) -> Option<StorageEvent> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).events.recent().copied())
    }

    /// Remove and return all events, oldest first
    pub fn drain(&self) -> Vec<StorageEvent, TELEMETRY_BUFFER_SIZE> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let mut result = Vec::new();
            for event in inner.events.oldest_ordered() {
                let _ = result.push(*event);
            }
            inner.events.clear();
            result
        })
    }
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_drain_in_order() {
        let buffer = TelemetryBuffer::new();
        assert!(buffer.is_empty());

        buffer.record(EventKind::Initialized, 10, 0);
        buffer.record(EventKind::Commit, 20, 1);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest().map(|e| e.kind), Some(EventKind::Commit));

        let events = buffer.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Initialized);
        assert_eq!(events[1].timestamp_ms, 20);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let buffer = TelemetryBuffer::new();
        for i in 0..TELEMETRY_BUFFER_SIZE as u32 + 3 {
            buffer.record(EventKind::Commit, i, i);
        }

        assert_eq!(buffer.len(), TELEMETRY_BUFFER_SIZE);
        assert_eq!(buffer.overflow_count(), 3);
        assert_eq!(buffer.drain()[0].detail, 3);
    }

    #[test]
    fn test_shared_static_buffer() {
        static EVENTS: TelemetryBuffer = TelemetryBuffer::new();

        std::thread::spawn(|| EVENTS.record(EventKind::Degraded, 1, 0))
            .join()
            .unwrap();
        assert_eq!(EVENTS.latest().map(|e| e.kind), Some(EventKind::Degraded));
    }
}
