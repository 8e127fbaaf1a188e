//! Recurring timers requested by the managers
//!
//! Each running timer is a spawned task that pushes one input into its
//! owner's queue per period. Starting a timer that is already running
//! replaces it; cancelling aborts the task, so no firing is delivered after
//! `cancel` returns to the owner's loop.

use std::collections::HashMap;

use core::time::Duration;
use huddle_core::TimerKind;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug, Default)]
pub struct TimerScheduler {
    timers: HashMap<TimerKind, JoinHandle<()>>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `timer`, delivering `tick()` to `sender` every `period`. The
    /// first firing happens one full period from now.
    pub fn start<S, F>(
        &mut self,
        timer: TimerKind,
        period: Duration,
        sender: mpsc::UnboundedSender<S>,
        mut tick: F,
    ) where
        S: Send + 'static,
        F: FnMut() -> S + Send + 'static,
    {
        self.cancel(timer);
        debug!("Starting timer {:?} every {:?}", timer, period);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(tick()).is_err() {
                    break;
                }
            }
        });
        self.timers.insert(timer, handle);
    }

    /// Returns whether the timer was running
    pub fn cancel(&mut self, timer: TimerKind) -> bool {
        match self.timers.remove(&timer) {
            Some(handle) => {
                debug!("Cancelling timer {:?}", timer);
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    pub fn is_running(&self, timer: TimerKind) -> bool {
        self.timers
            .get(&timer)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn running_count(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
