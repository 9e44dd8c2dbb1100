//! Commit scheduling
//!
//! - [`timer`]: wraparound-safe deadline with clock anomaly detection
//! - [`commit`]: periodic state saves and debounced config commits
//!
//! # Example
//!
//! ```rust
//! use devstore_core::scheduler::{CommitKind, CommitScheduler};
//!
//! let mut scheduler = CommitScheduler::new(0, 1000);
//! scheduler.save_with_delay(0, 2000);
//!
//! assert_eq!(scheduler.tick(1000), CommitKind::STATE);
//! assert_eq!(scheduler.tick(2000), CommitKind::STATE | CommitKind::CONFIG);
//! ```

pub mod commit;
pub mod timer;

pub use commit::{CommitKind, CommitScheduler, MIN_STATE_SAVE_PERIOD_MS};
pub use timer::{CommitTimer, TimerPoll, MAX_CLOCK_JUMP_MS};
