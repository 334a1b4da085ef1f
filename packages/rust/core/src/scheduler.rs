//! Recurring tick scheduling.
//!
//! The scheduler is a poll loop, not a cron table: every `poll` interval it
//! checks whether the next tick is due, runs it if so, and reschedules
//! relative to the completion time. A failed tick is logged and the loop
//! keeps going; nothing a tick does can terminate the schedule.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info};

use topicforge_shared::{Result, ScheduleConfig};

/// Drives a recurring task on a fixed interval.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    poll: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration, poll: Duration) -> Self {
        Self { interval, poll }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(
            Duration::from_secs(config.interval_days * 24 * 60 * 60),
            Duration::from_secs(config.poll_secs.max(1)),
        )
    }

    /// Run `task` now, then again every `interval`, polling for due time
    /// every `poll`. Never returns; task errors are logged and absorbed.
    pub async fn run_forever<F, Fut>(&self, mut task: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        info!(
            interval_secs = self.interval.as_secs(),
            poll_secs = self.poll.as_secs(),
            "scheduler started"
        );

        let mut next_due = Instant::now();
        loop {
            if Instant::now() >= next_due {
                if let Err(e) = task().await {
                    error!(error = %e, "scheduled tick failed");
                }
                // Interval measured from completion, so a slow tick never
                // stacks runs back to back.
                next_due = next_run_after(Instant::now(), self.interval);
                debug!(due_in_secs = self.interval.as_secs(), "next tick scheduled");
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

/// When the next run is due, given when the last one completed.
fn next_run_after(completed_at: Instant, interval: Duration) -> Instant {
    completed_at + interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn next_run_is_one_interval_after_completion() {
        let now = Instant::now();
        let interval = Duration::from_secs(60);
        assert_eq!(next_run_after(now, interval), now + interval);
    }

    #[test]
    fn config_conversion_uses_days_and_floors_poll() {
        let scheduler = Scheduler::from_config(&ScheduleConfig {
            interval_days: 7,
            poll_secs: 0,
        });
        assert_eq!(scheduler.interval, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(scheduler.poll, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_repeat_and_survive_failures() {
        let count = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(Duration::from_secs(10), Duration::from_secs(1));

        let task_count = count.clone();
        let handle = tokio::spawn(async move {
            scheduler
                .run_forever(move || {
                    let count = task_count.clone();
                    async move {
                        let n = count.fetch_add(1, Ordering::SeqCst);
                        if n % 2 == 0 {
                            Err(topicforge_shared::TopicforgeError::validation("boom"))
                        } else {
                            Ok(())
                        }
                    }
                })
                .await
        });

        // Paused clock auto-advances through the sleeps: the first run fires
        // immediately, then one per 10s interval, alternating failure and
        // success without the loop dying.
        tokio::time::sleep(Duration::from_secs(25)).await;
        handle.abort();

        assert!(count.load(Ordering::SeqCst) >= 3);
    }
}
