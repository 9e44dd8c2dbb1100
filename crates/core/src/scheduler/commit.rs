//! Commit scheduling for the state and config sections

use bitflags::bitflags;

use super::timer::{CommitTimer, TimerPoll};

/// Shortest accepted state save period
pub const MIN_STATE_SAVE_PERIOD_MS: u32 = 1000;

bitflags! {
    /// Sections due for a commit
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommitKind: u8 {
        /// Element state save is due
        const STATE = 0b00000001;
        /// Debounced config commit is due
        const CONFIG = 0b00000010;
    }
}

/// Decides when dirty sections are flushed
///
/// State is saved on a fixed period. Config changes arm a single debounce
/// deadline that every further change pushes forward, so a burst of edits
/// ends in one physical write.
#[derive(Debug, Clone)]
pub struct CommitScheduler {
    state: CommitTimer,
    state_period_ms: u32,
    config: CommitTimer,
    anomalies: u32,
}

impl CommitScheduler {
    /// Create a scheduler with the first state save one period after `now`
    ///
    /// Periods below [`MIN_STATE_SAVE_PERIOD_MS`] are raised to it.
    pub fn new(now: u32, state_period_ms: u32) -> Self {
        let state_period_ms = state_period_ms.max(MIN_STATE_SAVE_PERIOD_MS);
        let mut state = CommitTimer::idle();
        state.arm(now, state_period_ms);

        Self {
            state,
            state_period_ms,
            config: CommitTimer::idle(),
            anomalies: 0,
        }
    }

    /// Current state save period
    pub fn state_period_ms(&self) -> u32 {
        self.state_period_ms
    }

    /// Change the state save period and restart it at `now`
    pub fn set_state_period(&mut self, now: u32, period_ms: u32) {
        self.state_period_ms = period_ms.max(MIN_STATE_SAVE_PERIOD_MS);
        self.state.arm(now, self.state_period_ms);
    }

    /// Bring the next state save forward to `now + delay_ms`
    ///
    /// Has no effect if the periodic save is due sooner.
    pub fn schedule_state_save(&mut self, now: u32, delay_ms: u32) {
        match self.state.remaining(now) {
            Some(remaining) if remaining <= delay_ms => {}
            _ => self.state.arm(now, delay_ms),
        }
    }

    /// Set the config debounce deadline to `now + delay_ms`
    ///
    /// A pending deadline is replaced, pushing the commit further out.
    pub fn save_with_delay(&mut self, now: u32, delay_ms: u32) {
        self.config.arm(now, delay_ms);
    }

    /// Drop a pending config commit (after an immediate commit)
    pub fn cancel_config(&mut self) {
        self.config.disarm();
    }

    /// Check if a config commit is waiting for its deadline
    pub fn config_pending(&self) -> bool {
        self.config.is_armed()
    }

    /// Number of clock anomalies seen so far
    pub fn clock_anomalies(&self) -> u32 {
        self.anomalies
    }

    /// Report which commits are due at `now`
    ///
    /// A fired state timer restarts its period. A fired config timer is
    /// disarmed until the next change. On a clock anomaly the affected timer
    /// is restarted at `now` without firing.
    pub fn tick(&mut self, now: u32) -> CommitKind {
        let mut due = CommitKind::empty();

        match self.state.poll(now) {
            TimerPoll::Due => {
                due |= CommitKind::STATE;
                self.state.arm(now, self.state_period_ms);
            }
            TimerPoll::Anomaly => {
                self.anomalies = self.anomalies.wrapping_add(1);
                self.state.arm(now, self.state_period_ms);
            }
            TimerPoll::Idle | TimerPoll::Pending => {}
        }

        match self.config.poll(now) {
            TimerPoll::Due => {
                due |= CommitKind::CONFIG;
                self.config.disarm();
            }
            TimerPoll::Anomaly => {
                self.anomalies = self.anomalies.wrapping_add(1);
                let delay = self.config.delay_ms();
                self.config.arm(now, delay);
            }
            TimerPoll::Idle | TimerPoll::Pending => {}
        }

        due
    }
}
