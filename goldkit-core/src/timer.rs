//! Cancellable timers owned by a screen controller.
//!
//! Each timer is a tokio task that is aborted when the owning handle is
//! cancelled or dropped, so nothing fires into a disposed screen.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Returned from a tick callback to keep or stop the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Keep ticking.
    Continue,
    /// Stop after this tick.
    Stop,
}

/// A periodic tick. The first tick fires one `period` after start.
#[derive(Debug)]
pub struct ScheduledTick {
    task: Option<JoinHandle<()>>,
}

impl ScheduledTick {
    /// Spawns the tick loop on `runtime`.
    pub fn start<F>(runtime: &Handle, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        let task = runtime.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if on_tick() == TickControl::Stop {
                    break;
                }
            }
        });
        Self { task: Some(task) }
    }

    /// Stops the timer. Calling it again is a no-op.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the tick loop is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ScheduledTick {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A one-shot task that runs `work` after `delay` unless cancelled first.
#[derive(Debug)]
pub struct Deferred {
    task: Option<JoinHandle<()>>,
}

impl Deferred {
    /// Spawns `work` on `runtime`, delayed by `delay`.
    pub fn start<W>(runtime: &Handle, delay: Duration, work: W) -> Self
    where
        W: Future<Output = ()> + Send + 'static,
    {
        let task = runtime.spawn(async move {
            time::sleep(delay).await;
            work.await;
        });
        Self { task: Some(task) }
    }

    /// Cancels the task if it has not finished.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Lets the task run to completion without this handle.
    ///
    /// Used by work that has started and must not be cut off halfway.
    pub fn detach(mut self) {
        drop(self.task.take());
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_stopped() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let tick = ScheduledTick::start(&Handle::current(), Duration::from_secs(1), move || {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        });

        time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!tick.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let tick = ScheduledTick::start(&Handle::current(), Duration::from_secs(1), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        });

        time::sleep(Duration::from_millis(2_500)).await;
        drop(tick);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_cancel_before_delay() {
        let fired = Arc::new(AtomicU32::new(0));
        let flag = fired.clone();
        let mut deferred = Deferred::start(&Handle::current(), Duration::from_millis(150), async move {
            flag.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(100)).await;
        deferred.cancel();
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_runs_after_delay() {
        let fired = Arc::new(AtomicU32::new(0));
        let flag = fired.clone();
        let _deferred = Deferred::start(&Handle::current(), Duration::from_millis(150), async move {
            flag.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_deferred_finishes() {
        let fired = Arc::new(AtomicU32::new(0));
        let flag = fired.clone();
        let deferred = Deferred::start(&Handle::current(), Duration::from_millis(150), async move {
            time::sleep(Duration::from_secs(1)).await;
            flag.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(200)).await;
        deferred.detach();
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
