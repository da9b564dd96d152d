//! Session lifecycle hooks
//!
//! Optional features attach to a recording through [`SessionHook`] instead of
//! being wired into the state machine. Hooks run in registration order at each
//! phase and may register timer tasks on the session scheduler, which are
//! cancelled with the session.

use super::events::{EventSender, SessionEvent};
use super::scheduler::{Scheduler, TaskKind};
use crate::audio::LevelMeters;
use crate::config::{CaptureKind, Settings};
use crate::notify::Collaborator;
use std::sync::Arc;
use std::time::Duration;

/// Audio level publishing period
pub const AUDIO_METER_INTERVAL: Duration = Duration::from_millis(100);

/// What a hook can see and do during one phase
pub struct HookContext<'a> {
    settings: &'a Settings,
    kind: CaptureKind,
    scheduler: &'a mut Scheduler,
    events: &'a EventSender,
    collaborator: &'a Arc<dyn Collaborator>,
    levels: &'a LevelMeters,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        settings: &'a Settings,
        kind: CaptureKind,
        scheduler: &'a mut Scheduler,
        events: &'a EventSender,
        collaborator: &'a Arc<dyn Collaborator>,
        levels: &'a LevelMeters,
    ) -> Self {
        Self {
            settings,
            kind,
            scheduler,
            events,
            collaborator,
            levels,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    pub fn collaborator(&self) -> &Arc<dyn Collaborator> {
        self.collaborator
    }

    /// Level meters of the session's audio tracks
    pub fn levels(&self) -> &LevelMeters {
        self.levels
    }

    /// Stop the recording `after` from now, replacing any earlier deadline
    pub fn arm_auto_stop(&mut self, after: Duration) {
        arm_auto_stop(self.scheduler, self.events, after);
    }

    /// Run `tick` every `period` for the rest of the session
    pub fn every<F>(&mut self, kind: TaskKind, period: Duration, tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.scheduler.every(kind, period, tick);
    }

    pub fn cancel(&mut self, kind: TaskKind) -> bool {
        self.scheduler.cancel(kind)
    }
}

pub(crate) fn arm_auto_stop(scheduler: &mut Scheduler, events: &EventSender, after: Duration) {
    let events = events.clone();
    scheduler.after(TaskKind::AutoStop, after, move || {
        events.send(SessionEvent::AutoStop);
    });
    tracing::info!("Auto-stop in {}s", after.as_secs());
}

/// Optional behavior attached to every capture session
pub trait SessionHook: Send {
    fn name(&self) -> &'static str;

    /// Tracks are acquired, recording has not begun
    fn before_start(&mut self, _ctx: &mut HookContext<'_>) {}

    /// Recording is running
    fn after_start(&mut self, _ctx: &mut HookContext<'_>) {}

    /// Stop requested, encoder still running
    fn before_stop(&mut self, _ctx: &mut HookContext<'_>) {}

    /// The artifact is finalized or finalization failed
    fn after_stop(&mut self, _ctx: &mut HookContext<'_>) {}
}

/// Stops the recording after `auto_stop_minutes`
#[derive(Debug, Default)]
pub struct AutoStopHook;

impl SessionHook for AutoStopHook {
    fn name(&self) -> &'static str {
        "auto-stop"
    }

    fn after_start(&mut self, ctx: &mut HookContext<'_>) {
        if let Some(after) = ctx.settings().auto_stop() {
            ctx.arm_auto_stop(after);
        }
    }
}

/// Publishes audio levels while recording
#[derive(Debug, Default)]
pub struct AudioMeterHook;

impl SessionHook for AudioMeterHook {
    fn name(&self) -> &'static str {
        "audio-meter"
    }

    fn after_start(&mut self, ctx: &mut HookContext<'_>) {
        if ctx.levels().is_empty() {
            return;
        }
        let levels = ctx.levels().clone();
        let collaborator = ctx.collaborator().clone();
        ctx.every(TaskKind::AudioMeter, AUDIO_METER_INTERVAL, move || {
            collaborator.audio_levels(levels.read());
            true
        });
    }
}

/// Shows the cursor/click/keyboard effects overlay during video captures
#[derive(Debug, Default)]
pub struct EffectsOverlayHook {
    shown: bool,
}

impl SessionHook for EffectsOverlayHook {
    fn name(&self) -> &'static str {
        "effects-overlay"
    }

    fn after_start(&mut self, ctx: &mut HookContext<'_>) {
        if ctx.kind().has_video() && ctx.settings().effects.any() {
            ctx.collaborator().effects_overlay(true);
            self.shown = true;
        }
    }

    fn before_stop(&mut self, ctx: &mut HookContext<'_>) {
        if std::mem::take(&mut self.shown) {
            ctx.collaborator().effects_overlay(false);
        }
    }
}

/// Shows the floating elapsed-time overlay
#[derive(Debug, Default)]
pub struct TimerOverlayHook {
    shown: bool,
}

impl SessionHook for TimerOverlayHook {
    fn name(&self) -> &'static str {
        "timer-overlay"
    }

    fn after_start(&mut self, ctx: &mut HookContext<'_>) {
        if ctx.settings().show_timer_overlay {
            ctx.collaborator().timer_overlay(true);
            self.shown = true;
        }
    }

    fn before_stop(&mut self, ctx: &mut HookContext<'_>) {
        if std::mem::take(&mut self.shown) {
            ctx.collaborator().timer_overlay(false);
        }
    }
}

/// Hooks installed on a new recorder
pub fn default_hooks() -> Vec<Box<dyn SessionHook>> {
    vec![
        Box::new(AutoStopHook),
        Box::new(AudioMeterHook),
        Box::new(EffectsOverlayHook::default()),
        Box::new(TimerOverlayHook::default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::LevelMeter;
    use crate::notify::{ChannelCollaborator, StatusEvent};
    use crate::recorder::events::Envelope;
    use tokio::sync::mpsc;

    struct Harness {
        settings: Settings,
        scheduler: Scheduler,
        events: EventSender,
        rx: mpsc::UnboundedReceiver<Envelope>,
        collab: Arc<ChannelCollaborator>,
        collaborator: Arc<dyn Collaborator>,
        levels: LevelMeters,
    }

    impl Harness {
        fn new(settings: Settings) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            let collab = Arc::new(ChannelCollaborator::new(64));
            Self {
                settings,
                scheduler: Scheduler::new(),
                events: EventSender::new(1, tx),
                rx,
                collaborator: collab.clone(),
                collab,
                levels: LevelMeters::default(),
            }
        }

        fn run(&mut self, hook: &mut dyn SessionHook, kind: CaptureKind, stop: bool) {
            let mut ctx = HookContext::new(
                &self.settings,
                kind,
                &mut self.scheduler,
                &self.events,
                &self.collaborator,
                &self.levels,
            );
            if stop {
                hook.before_stop(&mut ctx);
            } else {
                hook.after_start(&mut ctx);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_hook_arms_deadline() {
        let mut h = Harness::new(Settings::default().with_auto_stop_minutes(1));
        h.run(&mut AutoStopHook, CaptureKind::Recording, false);
        assert!(h.scheduler.is_scheduled(TaskKind::AutoStop));

        tokio::time::advance(Duration::from_secs(59)).await;
        tokio::task::yield_now().await;
        assert!(h.rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        let env = h.rx.recv().await.unwrap();
        assert_eq!(env.generation, 1);
        assert!(matches!(env.event, SessionEvent::AutoStop));
    }

    #[tokio::test]
    async fn test_auto_stop_disabled_by_default() {
        let mut h = Harness::new(Settings::default());
        h.run(&mut AutoStopHook, CaptureKind::Recording, false);
        assert!(!h.scheduler.is_scheduled(TaskKind::AutoStop));
    }

    #[tokio::test]
    async fn test_audio_meter_needs_tracks() {
        let mut h = Harness::new(Settings::default());
        h.run(&mut AudioMeterHook, CaptureKind::Recording, false);
        assert!(!h.scheduler.is_scheduled(TaskKind::AudioMeter));

        h.levels.mic = Some(LevelMeter::new());
        h.run(&mut AudioMeterHook, CaptureKind::Audio, false);
        assert!(h.scheduler.is_scheduled(TaskKind::AudioMeter));
    }

    #[tokio::test]
    async fn test_overlays_shown_and_hidden() {
        let mut settings = Settings::default();
        settings.show_timer_overlay = true;
        settings.effects.click_effects = true;
        let mut h = Harness::new(settings);
        let mut rx = h.collab.subscribe();

        let mut effects = EffectsOverlayHook::default();
        let mut timer = TimerOverlayHook::default();
        h.run(&mut effects, CaptureKind::Recording, false);
        h.run(&mut timer, CaptureKind::Recording, false);
        h.run(&mut effects, CaptureKind::Recording, true);
        h.run(&mut timer, CaptureKind::Recording, true);

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                StatusEvent::EffectsOverlay(true),
                StatusEvent::TimerOverlay(true),
                StatusEvent::EffectsOverlay(false),
                StatusEvent::TimerOverlay(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_effects_skip_audio_captures() {
        let mut settings = Settings::default();
        settings.effects.cursor_highlight = true;
        let mut h = Harness::new(settings);
        let mut rx = h.collab.subscribe();
        h.run(&mut EffectsOverlayHook::default(), CaptureKind::Audio, false);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_default_hook_order() {
        let names: Vec<_> = default_hooks().iter().map(|h| h.name()).collect();
        assert_eq!(names, ["auto-stop", "audio-meter", "effects-overlay", "timer-overlay"]);
    }
}
