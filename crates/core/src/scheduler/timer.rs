//! Wraparound-safe deadline timer

/// Largest lateness accepted before a deadline is treated as a clock anomaly
///
/// A tick arriving this long after the deadline means the clock jumped
/// (or went backwards, which wraps to a huge elapsed time).
pub const MAX_CLOCK_JUMP_MS: u32 = 60 * 60 * 1000;

/// Result of polling a [`CommitTimer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPoll {
    /// Timer is not armed
    Idle,
    /// Deadline not reached yet
    Pending,
    /// Deadline passed
    Due,
    /// Elapsed time is implausible
    Anomaly,
}

/// A single deadline on a wrapping millisecond clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitTimer {
    armed_at: u32,
    delay_ms: u32,
    armed: bool,
}

impl CommitTimer {
    /// Create a disarmed timer
    pub const fn idle() -> Self {
        Self {
            armed_at: 0,
            delay_ms: 0,
            armed: false,
        }
    }

    /// Set the deadline to `now + delay_ms`, replacing any previous one
    pub fn arm(&mut self, now: u32, delay_ms: u32) {
        self.armed_at = now;
        self.delay_ms = delay_ms;
        self.armed = true;
    }

    /// Drop the deadline
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Check if a deadline is set
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Delay the timer was last armed with
    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Milliseconds until the deadline, `Some(0)` once passed
    pub fn remaining(&self, now: u32) -> Option<u32> {
        if !self.armed {
            return None;
        }
        let elapsed = now.wrapping_sub(self.armed_at);
        Some(self.delay_ms.saturating_sub(elapsed))
    }

    /// Compare `now` against the deadline
    pub fn poll(&self, now: u32) -> TimerPoll {
        if !self.armed {
            return TimerPoll::Idle;
        }

        let elapsed = now.wrapping_sub(self.armed_at);
        if elapsed < self.delay_ms {
            TimerPoll::Pending
        } else if elapsed - self.delay_ms > MAX_CLOCK_JUMP_MS {
            TimerPoll::Anomaly
        } else {
            TimerPoll::Due
        }
    }
}
