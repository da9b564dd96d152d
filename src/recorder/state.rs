//! Recorder states and elapsed-time accounting

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Recorder lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    CountingDown,
    Recording,
    Paused,
    Stopping,
    Finalizing,
}

impl RecorderState {
    pub fn name(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::CountingDown => "counting down",
            RecorderState::Recording => "recording",
            RecorderState::Paused => "paused",
            RecorderState::Stopping => "stopping",
            RecorderState::Finalizing => "finalizing",
        }
    }

    /// Is a capture session live and consuming input?
    pub fn is_capturing(&self) -> bool {
        matches!(self, RecorderState::Recording | RecorderState::Paused)
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock recording time, excluding pauses.
///
/// Resuming shifts `started_at` forward by the paused span, so elapsed time is
/// always `now - started_at` while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    started_at: Instant,
    paused_at: Option<Instant>,
    paused_accumulated: Duration,
}

impl TimerState {
    pub fn start(now: Instant) -> Self {
        Self {
            started_at: now,
            paused_at: None,
            paused_accumulated: Duration::ZERO,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Freeze the timer; false if already paused
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// Unfreeze the timer; false if not paused
    pub fn resume(&mut self, now: Instant) -> bool {
        let Some(paused_at) = self.paused_at.take() else {
            return false;
        };
        let paused_for = now.saturating_duration_since(paused_at);
        self.started_at += paused_for;
        self.paused_accumulated += paused_for;
        true
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(self.started_at)
    }

    /// Total time spent paused in completed pauses
    pub fn paused_total(&self) -> Duration {
        self.paused_accumulated
    }

    pub fn snapshot(&self, now: Instant) -> ElapsedTime {
        ElapsedTime::new(self.elapsed(now), self.is_paused())
    }
}

/// Elapsed time as displayed, `{time: "HH:MM:SS", paused}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ElapsedTime {
    pub time: String,
    pub paused: bool,
}

impl ElapsedTime {
    pub fn new(elapsed: Duration, paused: bool) -> Self {
        Self {
            time: format_hms(elapsed),
            paused,
        }
    }

    pub fn zero() -> Self {
        Self::new(Duration::ZERO, false)
    }
}

/// `HH:MM:SS`, whole seconds
pub fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::ZERO), "00:00:00");
        assert_eq!(format_hms(Duration::from_millis(61_999)), "00:01:01");
        assert_eq!(format_hms(Duration::from_secs(3600 * 12 + 59)), "12:00:59");
    }

    #[test]
    fn test_elapsed_excludes_pauses() {
        let t0 = Instant::now();
        let at = |s: u64| t0 + Duration::from_secs(s);

        let mut timer = TimerState::start(t0);
        assert_eq!(timer.elapsed(at(3)), Duration::from_secs(3));

        assert!(timer.pause(at(3)));
        assert!(!timer.pause(at(4)));
        // frozen while paused
        assert_eq!(timer.elapsed(at(8)), Duration::from_secs(3));
        assert!(timer.snapshot(at(8)).paused);

        assert!(timer.resume(at(8)));
        assert!(!timer.resume(at(9)));
        assert_eq!(timer.elapsed(at(10)), Duration::from_secs(5));
        assert_eq!(timer.paused_total(), Duration::from_secs(5));

        timer.pause(at(12));
        timer.resume(at(20));
        assert_eq!(timer.elapsed(at(21)), Duration::from_secs(8));
        assert_eq!(timer.snapshot(at(21)).time, "00:00:08");
    }

    #[test]
    fn test_state_names() {
        assert_eq!(RecorderState::CountingDown.to_string(), "counting down");
        assert!(RecorderState::Paused.is_capturing());
        assert!(!RecorderState::Finalizing.is_capturing());
    }
}
