//! Millisecond clocks for the commit scheduler
//!
//! Both clocks truncate to a wrapping `u32` counter, the same shape as the
//! hardware tick counters the scheduler is written against.

use devstore_core::traits::TimeSource;

/// Host clock backed by `std::time::Instant`
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Copy)]
pub struct StdTime {
    start: std::time::Instant,
}

#[cfg(any(test, feature = "std"))]
impl StdTime {
    /// Start a clock reading 0 now
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl Default for StdTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std"))]
impl TimeSource for StdTime {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Embassy time driver clock
#[cfg(feature = "embassy")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTime;

#[cfg(feature = "embassy")]
impl TimeSource for EmbassyTime {
    fn now_ms(&self) -> u32 {
        embassy_time::Instant::now().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_time_is_monotonic() {
        let time = StdTime::new();
        let first = time.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(time.elapsed_since(first) >= 5);
    }
}
