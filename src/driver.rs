//! Periodic tick source for hosts without a stack timer.
//!
//! The stack normally delivers the poll event itself. Hosts that drive a
//! [`ConnectionSet`](crate::registry::ConnectionSet) from a tokio runtime can
//! use [`PollTimer`] instead; connection objects are `!Send`, so the timer is
//! awaited on the thread that owns them rather than spawned.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::core::constants::POLL_INTERVAL;

/// Periodic tick generator.
#[derive(Debug, Clone, Copy)]
pub struct PollTimer {
    period: Duration,
}

impl PollTimer {
    /// Create a timer ticking every `period`.
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// The tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Call `tick` every period until `shutdown` fires or its sender is dropped.
    ///
    /// The first tick happens immediately. Returns the number of ticks delivered.
    pub async fn run<F>(self, mut tick: F, mut shutdown: oneshot::Receiver<()>) -> usize
    where
        F: FnMut(),
    {
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(period_ms = self.period.as_millis() as u64, "poll timer starting");

        let mut ticks = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tick();
                    ticks += 1;
                }
                _ = &mut shutdown => {
                    debug!(ticks, "poll timer stopped");
                    break;
                }
            }
        }
        ticks
    }
}

impl Default for PollTimer {
    fn default() -> Self {
        Self::new(POLL_INTERVAL)
    }
}
