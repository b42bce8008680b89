//! Periodic refresh ticks
//!
//! Forces the reactor to recompute status for the current target on a fixed
//! period, independent of notifications and filesystem events.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::reactor::{Event, EventSender};

/// Running refresh timer
pub struct RefreshTicker {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl RefreshTicker {
    /// Start emitting [`Event::RefreshTick`] every `interval`
    ///
    /// The first tick fires one full interval after start.
    pub fn start(interval: Duration, events: EventSender) -> Self {
        debug!(?interval, "RefreshTicker::start: called");
        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                if events.send(Event::RefreshTick).is_err() {
                    debug!("RefreshTicker: event queue closed, exiting");
                    break;
                }
            }
        });

        Self {
            interval,
            task: Some(task),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the timer; no ticks are sent afterwards
    pub fn stop(mut self) {
        debug!("RefreshTicker::stop: called");
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RefreshTicker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
