//! Timer task registry
//!
//! Every periodic or delayed job of a session is a tokio task registered here
//! under a [`TaskKind`]. Registering a kind again replaces the previous task,
//! and [`Scheduler::cancel_all`] aborts everything at once.

use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Scheduled job identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Countdown,
    DrawLoop,
    ChunkFlush,
    ElapsedTicker,
    AutoStop,
    AudioMeter,
    ScheduledStart,
}

/// Owns the timer tasks of one session
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: HashMap<TaskKind, JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a future as the task for `kind`
    pub fn spawn<F>(&mut self, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(old) = self.tasks.insert(kind, tokio::spawn(future)) {
            old.abort();
        }
    }

    /// Call `tick` every `period`, first one period after this call; stops
    /// when it returns false
    pub fn every<F>(&mut self, kind: TaskKind, period: Duration, mut tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let first = Instant::now() + period;
        self.spawn(kind, async move {
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        });
    }

    /// Call `fire` once, `delay` after this call
    pub fn after<F>(&mut self, kind: TaskKind, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        self.spawn(kind, async move {
            tokio::time::sleep_until(deadline).await;
            fire();
        });
    }

    /// Abort the task for `kind`; true if one was running
    pub fn cancel(&mut self, kind: TaskKind) -> bool {
        match self.tasks.remove(&kind) {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                running
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    /// Is a task for `kind` registered and still running?
    pub fn is_scheduled(&self, kind: TaskKind) -> bool {
        self.tasks.get(&kind).is_some_and(|h| !h.is_finished())
    }

    /// Number of running tasks
    pub fn active(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Time until the next occurrence of `target`; rolls over to tomorrow when
/// `target` is not after `now`
pub fn delay_until(target: NaiveTime, now: NaiveDateTime) -> Duration {
    let mut next = now.date().and_time(target);
    if next <= now {
        next += ChronoDuration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_ticks_until_cancelled() {
        let mut scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        scheduler.every(TaskKind::ElapsedTicker, Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
            true
        });

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_scheduled(TaskKind::ElapsedTicker));

        assert!(scheduler.cancel(TaskKind::ElapsedTicker));
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!scheduler.cancel(TaskKind::ElapsedTicker));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_stops_when_tick_returns_false() {
        let mut scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        scheduler.every(TaskKind::Countdown, Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst) < 1
        });
        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!scheduler.is_scheduled(TaskKind::Countdown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_deadline() {
        let mut scheduler = Scheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        scheduler.after(TaskKind::AutoStop, Duration::from_secs(60), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::advance(Duration::from_secs(30)).await;

        let f = fired.clone();
        scheduler.after(TaskKind::AutoStop, Duration::from_secs(120), move || {
            f.fetch_add(10, Ordering::SeqCst);
        });
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_counts_from_arming() {
        let mut scheduler = Scheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        scheduler.after(TaskKind::AutoStop, Duration::from_secs(10), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = ticks.clone();
        scheduler.every(TaskKind::ChunkFlush, Duration::from_secs(2), move || {
            t.fetch_add(1, Ordering::SeqCst);
            true
        });

        // Neither task has been polled yet
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let mut scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        for kind in [TaskKind::ChunkFlush, TaskKind::ElapsedTicker, TaskKind::AudioMeter] {
            let c = count.clone();
            scheduler.every(kind, Duration::from_millis(100), move || {
                c.fetch_add(1, Ordering::SeqCst);
                true
            });
        }
        assert_eq!(scheduler.active(), 3);
        scheduler.cancel_all();
        assert_eq!(scheduler.active(), 0);
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_delay_until_rolls_over() {
        let now = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let later = NaiveTime::from_hms_opt(15, 0, 0).unwrap();
        assert_eq!(delay_until(later, now), Duration::from_secs(30 * 60));

        let earlier = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(delay_until(earlier, now), Duration::from_secs((18 * 60 + 30) * 60));

        let same = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert_eq!(delay_until(same, now), Duration::from_secs(24 * 3600));
    }
}
