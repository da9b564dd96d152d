//! Status notifications to the embedding application
//!
//! Every method on [`Collaborator`] has a no-op default, so an embedder only
//! implements what it displays.

use crate::audio::AudioLevels;
use crate::output::FinalizeOutcome;
use crate::recorder::ElapsedTime;
use tokio::sync::broadcast;

/// Conversion progress as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionStatus {
    Converting,
    Done,
    Failed,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Converting => "Converting...",
            ConversionStatus::Done => "done",
            ConversionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of recorder status updates
pub trait Collaborator: Send + Sync {
    /// Recording started (`true`) or capture ended (`false`)
    fn recording_active(&self, _active: bool) {}

    fn conversion_status(&self, _status: ConversionStatus) {}

    /// Elapsed recording time, sent once per second and on pause/resume
    fn timer_update(&self, _elapsed: &ElapsedTime) {}

    /// Seconds left before recording starts
    fn countdown(&self, _remaining: u32) {}

    fn timer_overlay(&self, _visible: bool) {}

    fn effects_overlay(&self, _active: bool) {}

    fn audio_levels(&self, _levels: AudioLevels) {}

    /// An artifact was written
    fn capture_saved(&self, _outcome: &FinalizeOutcome) {}

    /// A capture failed without producing an artifact
    fn capture_failed(&self, _error: &crate::Error) {}
}

/// Collaborator that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCollaborator;

impl Collaborator for NoopCollaborator {}

/// Status update as a value
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    RecordingActive(bool),
    Conversion(ConversionStatus),
    Elapsed(ElapsedTime),
    Countdown(u32),
    TimerOverlay(bool),
    EffectsOverlay(bool),
    AudioLevels(AudioLevels),
    Saved(FinalizeOutcome),
    Failed(String),
}

/// Collaborator publishing [`StatusEvent`]s on a broadcast channel
#[derive(Debug, Clone)]
pub struct ChannelCollaborator {
    tx: broadcast::Sender<StatusEvent>,
}

impl ChannelCollaborator {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, event: StatusEvent) {
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for ChannelCollaborator {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Collaborator for ChannelCollaborator {
    fn recording_active(&self, active: bool) {
        self.publish(StatusEvent::RecordingActive(active));
    }

    fn conversion_status(&self, status: ConversionStatus) {
        self.publish(StatusEvent::Conversion(status));
    }

    fn timer_update(&self, elapsed: &ElapsedTime) {
        self.publish(StatusEvent::Elapsed(elapsed.clone()));
    }

    fn countdown(&self, remaining: u32) {
        self.publish(StatusEvent::Countdown(remaining));
    }

    fn timer_overlay(&self, visible: bool) {
        self.publish(StatusEvent::TimerOverlay(visible));
    }

    fn effects_overlay(&self, active: bool) {
        self.publish(StatusEvent::EffectsOverlay(active));
    }

    fn audio_levels(&self, levels: AudioLevels) {
        self.publish(StatusEvent::AudioLevels(levels));
    }

    fn capture_saved(&self, outcome: &FinalizeOutcome) {
        self.publish(StatusEvent::Saved(outcome.clone()));
    }

    fn capture_failed(&self, error: &crate::Error) {
        self.publish(StatusEvent::Failed(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(ConversionStatus::Converting.to_string(), "Converting...");
        assert_eq!(ConversionStatus::Done.as_str(), "done");
        assert_eq!(ConversionStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_channel_collaborator_publishes() {
        let collab = ChannelCollaborator::new(8);
        let mut rx = collab.subscribe();
        collab.recording_active(true);
        collab.countdown(2);
        collab.conversion_status(ConversionStatus::Done);

        assert_eq!(rx.try_recv().unwrap(), StatusEvent::RecordingActive(true));
        assert_eq!(rx.try_recv().unwrap(), StatusEvent::Countdown(2));
        assert_eq!(rx.try_recv().unwrap(), StatusEvent::Conversion(ConversionStatus::Done));
    }

    #[test]
    fn test_noop_accepts_everything() {
        let collab: &dyn Collaborator = &NoopCollaborator;
        collab.recording_active(true);
        collab.audio_levels(AudioLevels::default());
    }
}
