//! Async commit task
//!
//! Drives [`Storage::iterate`] from an Embassy executor. Other tasks talk to
//! it through a [`CommitRequest`] channel instead of locking the storage
//! themselves for every change.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};

use devstore_core::state::StateRegistry;
use devstore_core::traits::{Medium, TimeSource};

use super::Storage;

/// Depth of the request channel
pub const REQUEST_QUEUE_DEPTH: usize = 4;

/// Request channel type
pub type CommitChannel = Channel<CriticalSectionRawMutex, CommitRequest, REQUEST_QUEUE_DEPTH>;

/// Message to the commit task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitRequest {
    /// Config changed; commit after the debounce delay
    Schedule,
    /// Commit config and state now
    Immediate,
}

/// Handle to the commit task
pub struct CommitRunner {
    channel: &'static CommitChannel,
}

impl CommitRunner {
    /// Create a runner listening on `channel`
    pub fn new(channel: &'static CommitChannel) -> Self {
        Self { channel }
    }

    /// Ask for a debounced config commit
    pub async fn schedule_commit(&self) {
        self.channel.send(CommitRequest::Schedule).await;
    }

    /// Ask for an immediate commit
    pub async fn commit_now(&self) {
        self.channel.send(CommitRequest::Immediate).await;
    }

    /// Run the task forever (spawn from the executor)
    ///
    /// Wakes every `poll_interval_ms` to run the scheduler, or early when a
    /// request arrives.
    pub async fn run<M: Medium, T: TimeSource>(
        &self,
        storage: &Mutex<CriticalSectionRawMutex, Storage<M, T>>,
        registry: &Mutex<CriticalSectionRawMutex, StateRegistry<'_>>,
        poll_interval_ms: u64,
    ) {
        loop {
            match select(
                Timer::after(Duration::from_millis(poll_interval_ms)),
                self.channel.receive(),
            )
            .await
            {
                Either::First(_) => {
                    let mut storage = storage.lock().await;
                    let mut registry = registry.lock().await;
                    if storage.iterate(&mut registry).is_err() {
                        crate::log_error!("Scheduled commit failed");
                    }
                }
                Either::Second(CommitRequest::Schedule) => {
                    let mut storage = storage.lock().await;
                    let delay = storage.settings().config_save_delay_ms;
                    storage.save_with_delay(delay);
                }
                Either::Second(CommitRequest::Immediate) => {
                    let mut storage = storage.lock().await;
                    let mut registry = registry.lock().await;
                    crate::log_info!("Immediate commit requested");
                    if storage.commit_config().is_err() {
                        crate::log_error!("Config commit failed");
                    }
                    if storage.save_state(&mut registry).is_err() {
                        crate::log_error!("State save failed");
                    }
                }
            }
        }
    }
}
