// Owned, cancellable timers.
//
// A `ScheduledTask` is held by exactly one component. Cancelling or dropping
// it aborts the underlying tokio task, so a timer can never outlive the
// component that armed it. Callbacks run on the timer task and should only
// post a message back to the owner.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `fire` once after `delay`.
    pub fn after<F>(delay: Duration, fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            fire();
        });
        Self { handle }
    }

    /// Run `tick` every `period`, first one `period` from now.
    ///
    /// Ticks missed while the runtime was busy are skipped, never burst.
    pub fn every<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tick();
            }
        });
        Self { handle }
    }

    /// Abort the timer. Idempotent.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// True once a one-shot has fired or the task was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
