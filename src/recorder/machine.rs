//! Recorder state machine
//!
//! The recorder runs as a single tokio task owning every piece of mutable
//! state. Callers talk to it through a cloneable [`RecorderHandle`]; timers
//! and background tasks talk to it through session-tagged events. Events
//! from an older session generation are dropped, so nothing scheduled by a
//! finished recording can touch the next one.
//!
//! ```text
//! Idle -> CountingDown -> Recording <-> Paused -> Stopping -> Finalizing -> Idle
//! ```

use super::events::{Envelope, EventSender, SessionEvent, IDLE_GENERATION};
use super::hooks::{arm_auto_stop, default_hooks, HookContext, SessionHook};
use super::scheduler::{delay_until, Scheduler, TaskKind};
use super::session::{CaptureSession, SessionFactory, SessionGuard};
use super::state::{ElapsedTime, RecorderState};
use crate::capture::{SourceId, StreamAcquisition};
use crate::config::{CaptureKind, Settings};
use crate::encode::{EncoderFactory, Transcoder};
use crate::error::{Error, Result};
use crate::notify::{Collaborator, NoopCollaborator};
use crate::output::{FinalizeOutcome, OutputFinalizer};
use crate::processing::{PipPosition, WebcamOverlayConfig, ZoomGesture, ZoomState};

use chrono::{Local, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Elapsed-time update period
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Encoder chunk collection period
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

const COMMAND_QUEUE: usize = 32;

/// What to record, and from where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRequest {
    pub kind: CaptureKind,
    /// Display source; unused for audio-only captures
    pub source: Option<SourceId>,
}

impl StartRequest {
    pub fn recording(source: SourceId) -> Self {
        Self {
            kind: CaptureKind::Recording,
            source: Some(source),
        }
    }

    pub fn gif(source: SourceId) -> Self {
        Self {
            kind: CaptureKind::Gif,
            source: Some(source),
        }
    }

    pub fn audio() -> Self {
        Self {
            kind: CaptureKind::Audio,
            source: None,
        }
    }

    fn validate(&self) -> Result<()> {
        match self.kind {
            CaptureKind::Recording | CaptureKind::Gif | CaptureKind::Audio => Ok(()),
            other => Err(Error::Config(format!("{} is not a recording kind", other.prefix()))),
        }
    }
}

/// Snapshot of the recorder
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderStatus {
    pub state: RecorderState,
    pub kind: Option<CaptureKind>,
    pub elapsed: Option<ElapsedTime>,
    pub elapsed_duration: Option<Duration>,
    /// Chunks collected so far
    pub chunks: usize,
    pub bytes: usize,
    pub zoom: Option<ZoomState>,
    pub auto_stop_armed: bool,
    pub scheduled_start: bool,
    /// Optional sources (desktop audio, microphone, webcam) recorded without
    pub missing_sources: Vec<&'static str>,
}

enum Command {
    Start {
        request: StartRequest,
        reply: oneshot::Sender<Result<()>>,
    },
    Pause {
        reply: oneshot::Sender<Result<()>>,
    },
    Resume {
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<Result<FinalizeOutcome>>,
    },
    Abort {
        reply: oneshot::Sender<Result<()>>,
    },
    SetAutoStop {
        minutes: u32,
        reply: oneshot::Sender<()>,
    },
    ScheduleStart {
        at: NaiveTime,
        request: StartRequest,
        reply: oneshot::Sender<Result<Duration>>,
    },
    CancelScheduledStart {
        reply: oneshot::Sender<bool>,
    },
    Zoom {
        gesture: ZoomGesture,
        reply: oneshot::Sender<Option<ZoomState>>,
    },
    Webcam {
        enabled: Option<bool>,
        position: Option<PipPosition>,
        reply: oneshot::Sender<WebcamOverlayConfig>,
    },
    Status {
        reply: oneshot::Sender<RecorderStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Recorder builder
pub struct Recorder {
    settings: Settings,
    acquisition: Arc<dyn StreamAcquisition>,
    encoders: Arc<dyn EncoderFactory>,
    transcoder: Arc<dyn Transcoder>,
    collaborator: Arc<dyn Collaborator>,
    sessions: SessionFactory,
    hooks: Vec<Box<dyn SessionHook>>,
}

impl Recorder {
    pub fn new(
        settings: Settings,
        acquisition: Arc<dyn StreamAcquisition>,
        encoders: Arc<dyn EncoderFactory>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            settings,
            acquisition,
            encoders,
            transcoder,
            collaborator: Arc::new(NoopCollaborator),
            sessions: SessionFactory::new(),
            hooks: default_hooks(),
        }
    }

    pub fn with_collaborator(mut self, collaborator: Arc<dyn Collaborator>) -> Self {
        self.collaborator = collaborator;
        self
    }

    /// Share the single-session slot with other recorders
    pub fn with_session_factory(mut self, sessions: SessionFactory) -> Self {
        self.sessions = sessions;
        self
    }

    /// Replace the session hooks
    pub fn with_hooks(mut self, hooks: Vec<Box<dyn SessionHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Start the recorder task
    pub fn spawn(self) -> RecorderHandle {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let finalizer = OutputFinalizer::new(
            self.settings.save_path.clone(),
            self.transcoder,
            self.collaborator.clone(),
        );

        let machine = Machine {
            settings: self.settings,
            acquisition: self.acquisition,
            encoders: self.encoders,
            finalizer: Arc::new(finalizer),
            collaborator: self.collaborator,
            sessions: self.sessions,
            hooks: self.hooks,
            state: RecorderState::Idle,
            generation: IDLE_GENERATION,
            session: None,
            pending: None,
            pending_stop: None,
            idle_tasks: Scheduler::new(),
            events_tx,
            events_rx,
            commands,
            shutdown_replies: Vec::new(),
            shutting_down: false,
        };
        tokio::spawn(machine.run());

        RecorderHandle { tx }
    }
}

/// Cloneable handle to a running recorder
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<Command>,
}

impl RecorderHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::RecorderClosed)?;
        rx.await.map_err(|_| Error::RecorderClosed)
    }

    /// Start recording; resolves once the countdown is over and capture runs
    pub async fn start(&self, request: StartRequest) -> Result<()> {
        self.request(|reply| Command::Start { request, reply }).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| Command::Resume { reply }).await?
    }

    /// Stop recording; resolves once the artifact is saved
    pub async fn stop(&self) -> Result<FinalizeOutcome> {
        self.request(|reply| Command::Stop { reply }).await?
    }

    /// Cancel a countdown, or stop a running recording without waiting
    pub async fn abort(&self) -> Result<()> {
        self.request(|reply| Command::Abort { reply }).await?
    }

    /// Change the auto-stop limit (0 disables); a running recording is rearmed from now
    pub async fn set_auto_stop(&self, minutes: u32) -> Result<()> {
        self.request(|reply| Command::SetAutoStop { minutes, reply })
            .await
    }

    /// Start a recording at the next occurrence of `at` local time
    pub async fn schedule_start(&self, at: NaiveTime, request: StartRequest) -> Result<Duration> {
        self.request(|reply| Command::ScheduleStart { at, request, reply })
            .await?
    }

    pub async fn cancel_scheduled_start(&self) -> Result<bool> {
        self.request(|reply| Command::CancelScheduledStart { reply })
            .await
    }

    /// Apply a zoom gesture; `None` when nothing is being recorded with video
    pub async fn zoom(&self, gesture: ZoomGesture) -> Result<Option<ZoomState>> {
        self.request(|reply| Command::Zoom { gesture, reply }).await
    }

    /// Toggle or move the webcam overlay
    pub async fn set_webcam(
        &self,
        enabled: Option<bool>,
        position: Option<PipPosition>,
    ) -> Result<WebcamOverlayConfig> {
        self.request(|reply| Command::Webcam {
            enabled,
            position,
            reply,
        })
        .await
    }

    pub async fn status(&self) -> Result<RecorderStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Stop any recording, wait for it to be saved and end the recorder task
    pub async fn shutdown(&self) -> Result<()> {
        match self.request(|reply| Command::Shutdown { reply }).await {
            Ok(()) | Err(Error::RecorderClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Start waiting for its countdown
struct PendingStart {
    request: StartRequest,
    guard: SessionGuard,
    reply: Option<oneshot::Sender<Result<()>>>,
    _countdown: Scheduler,
}

#[derive(Debug, Clone, Copy)]
enum HookPhase {
    BeforeStart,
    AfterStart,
    BeforeStop,
    AfterStop,
}

fn invalid(action: &'static str, state: RecorderState) -> Error {
    Error::InvalidState {
        action,
        state: state.name(),
    }
}

fn reply_to<T>(reply: Option<oneshot::Sender<T>>, value: T) {
    if let Some(reply) = reply {
        // caller may have gone away
        let _ = reply.send(value);
    }
}

struct Machine {
    settings: Settings,
    acquisition: Arc<dyn StreamAcquisition>,
    encoders: Arc<dyn EncoderFactory>,
    finalizer: Arc<OutputFinalizer>,
    collaborator: Arc<dyn Collaborator>,
    sessions: SessionFactory,
    hooks: Vec<Box<dyn SessionHook>>,

    state: RecorderState,
    generation: u64,
    session: Option<CaptureSession>,
    pending: Option<PendingStart>,
    pending_stop: Option<oneshot::Sender<Result<FinalizeOutcome>>>,
    /// Tasks outliving sessions (scheduled start)
    idle_tasks: Scheduler,

    events_tx: mpsc::UnboundedSender<Envelope>,
    events_rx: mpsc::UnboundedReceiver<Envelope>,
    commands: mpsc::Receiver<Command>,
    shutdown_replies: Vec<oneshot::Sender<()>>,
    shutting_down: bool,
}

impl Machine {
    async fn run(mut self) {
        let mut commands_open = true;

        loop {
            if self.shutting_down && self.state == RecorderState::Idle {
                break;
            }

            tokio::select! {
                biased;

                Some(envelope) = self.events_rx.recv() => {
                    self.handle_event(envelope).await;
                }

                command = self.commands.recv(), if commands_open && !self.shutting_down => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            commands_open = false;
                            self.begin_shutdown().await;
                        }
                    }
                }
            }
        }

        self.idle_tasks.cancel_all();
        for reply in self.shutdown_replies.drain(..) {
            let _ = reply.send(());
        }
        tracing::debug!("Recorder task stopped");
    }

    fn event_sender(&self) -> EventSender {
        EventSender::new(self.generation, self.events_tx.clone())
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { request, reply } => {
                if self.state != RecorderState::Idle {
                    let _ = reply.send(Err(invalid("start", self.state)));
                    return;
                }
                self.start(request, Some(reply)).await;
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            Command::Stop { reply } => {
                if self.state.is_capturing() {
                    self.begin_stop(Some(reply)).await;
                } else {
                    let _ = reply.send(Err(invalid("stop", self.state)));
                }
            }
            Command::Abort { reply } => {
                let result = match self.state {
                    RecorderState::CountingDown => {
                        self.cancel_countdown();
                        Ok(())
                    }
                    RecorderState::Recording | RecorderState::Paused => {
                        self.begin_stop(None).await;
                        Ok(())
                    }
                    state => Err(invalid("abort", state)),
                };
                let _ = reply.send(result);
            }
            Command::SetAutoStop { minutes, reply } => {
                self.settings.auto_stop_minutes = minutes;
                let events = self.event_sender();
                if let (true, Some(session)) = (self.state.is_capturing(), self.session.as_mut()) {
                    match self.settings.auto_stop() {
                        Some(after) => arm_auto_stop(session.scheduler_mut(), &events, after),
                        None => {
                            if session.scheduler_mut().cancel(TaskKind::AutoStop) {
                                tracing::info!("Auto-stop disabled");
                            }
                        }
                    }
                }
                let _ = reply.send(());
            }
            Command::ScheduleStart { at, request, reply } => {
                let _ = reply.send(self.schedule_start(at, request));
            }
            Command::CancelScheduledStart { reply } => {
                let cancelled = self.idle_tasks.cancel(TaskKind::ScheduledStart);
                if cancelled {
                    tracing::info!("Scheduled start cancelled");
                }
                let _ = reply.send(cancelled);
            }
            Command::Zoom { gesture, reply } => {
                let state = match (self.state.is_capturing(), self.session.as_mut()) {
                    (true, Some(session)) => session.apply_zoom(gesture),
                    _ => None,
                };
                let _ = reply.send(state);
            }
            Command::Webcam {
                enabled,
                position,
                reply,
            } => {
                if let Some(enabled) = enabled {
                    self.settings.webcam.enabled = enabled;
                }
                if let Some(position) = position {
                    self.settings.webcam.position = position;
                }
                let config =
                    WebcamOverlayConfig::new(self.settings.webcam.enabled, self.settings.webcam.position);
                if let Some(session) = &mut self.session {
                    session.set_overlay(config);
                }
                let _ = reply.send(config);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown { reply } => {
                self.shutdown_replies.push(reply);
                self.begin_shutdown().await;
            }
        }
    }

    async fn handle_event(&mut self, envelope: Envelope) {
        if envelope.generation != IDLE_GENERATION && envelope.generation != self.generation {
            tracing::trace!("Dropping event from session {}", envelope.generation);
            return;
        }

        match envelope.event {
            SessionEvent::CountdownTick(remaining) => {
                if self.state == RecorderState::CountingDown {
                    self.collaborator.countdown(remaining);
                }
            }
            SessionEvent::CountdownDone => {
                if self.state != RecorderState::CountingDown {
                    return;
                }
                if let Some(pending) = self.pending.take() {
                    let PendingStart {
                        request,
                        guard,
                        reply,
                        ..
                    } = pending;
                    self.begin_recording(request, guard, reply).await;
                }
            }
            SessionEvent::Tick => {
                if self.state != RecorderState::Recording {
                    return;
                }
                if let Some(elapsed) = self.session.as_ref().and_then(|s| s.elapsed(Instant::now())) {
                    self.collaborator.timer_update(&elapsed);
                }
            }
            SessionEvent::Flush => {
                if !self.state.is_capturing() {
                    return;
                }
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if let Err(e) = session.flush().await {
                    tracing::error!("Encoder failed, stopping: {}", e);
                    self.begin_stop(None).await;
                }
            }
            SessionEvent::AutoStop => {
                if self.state.is_capturing() {
                    tracing::info!("Auto-stop limit reached");
                    self.begin_stop(None).await;
                }
            }
            SessionEvent::Finalized(result) => self.complete(result),
            SessionEvent::ScheduledStart(request) => {
                if self.state == RecorderState::Idle && !self.shutting_down {
                    tracing::info!("Starting scheduled {}", request.kind.prefix());
                    self.start(request, None).await;
                } else {
                    tracing::warn!("Scheduled start skipped: recorder is {}", self.state);
                }
            }
        }
    }

    async fn start(&mut self, request: StartRequest, reply: Option<oneshot::Sender<Result<()>>>) {
        if let Err(e) = request.validate().and_then(|()| self.settings.validate()) {
            reply_to(reply, Err(e));
            return;
        }
        let guard = match self.sessions.try_acquire() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!("Cannot start: {}", e);
                reply_to(reply, Err(e));
                return;
            }
        };

        self.generation += 1;
        let countdown = self.settings.countdown_secs;
        if countdown == 0 {
            self.begin_recording(request, guard, reply).await;
            return;
        }

        let events = self.event_sender();
        let mut scheduler = Scheduler::new();
        let mut remaining = countdown;
        scheduler.every(TaskKind::Countdown, Duration::from_secs(1), move || {
            remaining -= 1;
            if remaining == 0 {
                events.send(SessionEvent::CountdownDone);
                false
            } else {
                events.send(SessionEvent::CountdownTick(remaining))
            }
        });

        self.pending = Some(PendingStart {
            request,
            guard,
            reply,
            _countdown: scheduler,
        });
        self.state = RecorderState::CountingDown;
        self.collaborator.countdown(countdown);
        tracing::info!("Recording starts in {}s", countdown);
    }

    fn cancel_countdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            reply_to(pending.reply, Err(Error::Aborted));
        }
        self.state = RecorderState::Idle;
        tracing::info!("Countdown aborted");
    }

    async fn begin_recording(
        &mut self,
        request: StartRequest,
        guard: SessionGuard,
        reply: Option<oneshot::Sender<Result<()>>>,
    ) {
        let opened = CaptureSession::open(
            guard,
            &request,
            &self.settings,
            self.acquisition.as_ref(),
            self.encoders.as_ref(),
        )
        .await;

        let mut session = match opened {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Failed to start {}: {}", request.kind.prefix(), e);
                self.state = RecorderState::Idle;
                self.collaborator.capture_failed(&e);
                reply_to(reply, Err(e));
                return;
            }
        };

        let events = self.event_sender();
        session.begin(Instant::now());
        let flush_events = events.clone();
        session
            .scheduler_mut()
            .every(TaskKind::ChunkFlush, FLUSH_INTERVAL, move || {
                flush_events.send(SessionEvent::Flush)
            });
        start_ticker(&mut session, events);
        self.session = Some(session);

        self.run_hooks(HookPhase::BeforeStart);
        self.state = RecorderState::Recording;
        self.collaborator.recording_active(true);
        self.collaborator.timer_update(&ElapsedTime::zero());
        self.run_hooks(HookPhase::AfterStart);

        tracing::info!("Recording {} started", request.kind.prefix());
        reply_to(reply, Ok(()));
    }

    fn pause(&mut self) -> Result<()> {
        if self.state != RecorderState::Recording {
            return Err(invalid("pause", self.state));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(invalid("pause", self.state));
        };

        let now = Instant::now();
        session.pause(now);
        session.scheduler_mut().cancel(TaskKind::ElapsedTicker);
        let elapsed = session.elapsed(now);

        self.state = RecorderState::Paused;
        if let Some(elapsed) = elapsed {
            self.collaborator.timer_update(&elapsed);
        }
        tracing::info!("Recording paused");
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if self.state != RecorderState::Paused {
            return Err(invalid("resume", self.state));
        }
        let events = self.event_sender();
        let Some(session) = self.session.as_mut() else {
            return Err(invalid("resume", self.state));
        };

        let now = Instant::now();
        session.resume(now);
        start_ticker(session, events);
        let elapsed = session.elapsed(now);

        self.state = RecorderState::Recording;
        if let Some(elapsed) = elapsed {
            self.collaborator.timer_update(&elapsed);
        }
        tracing::info!("Recording resumed");
        Ok(())
    }

    async fn begin_stop(&mut self, reply: Option<oneshot::Sender<Result<FinalizeOutcome>>>) {
        if !self.state.is_capturing() {
            reply_to(reply, Err(invalid("stop", self.state)));
            return;
        }
        self.pending_stop = reply;
        self.run_hooks(HookPhase::BeforeStop);
        self.state = RecorderState::Stopping;

        let Some(session) = self.session.as_mut() else {
            self.state = RecorderState::Idle;
            reply_to(self.pending_stop.take(), Err(invalid("stop", RecorderState::Idle)));
            return;
        };

        let elapsed = session.elapsed_duration(Instant::now());
        if let Err(e) = session.stop_capture().await {
            tracing::warn!("Encoder did not finish cleanly: {}", e);
        }
        let chunks = session.take_chunks();
        let (kind, format, tier) = session.output();
        self.collaborator.recording_active(false);

        tracing::info!(
            "Recording stopped after {}s: {} chunks, {} bytes",
            elapsed.as_secs(),
            chunks.len(),
            chunks.total_bytes()
        );

        self.state = RecorderState::Finalizing;
        let finalizer = self.finalizer.clone();
        let events = self.event_sender();
        tokio::spawn(async move {
            let result = finalizer.finalize(chunks, kind, format, tier).await;
            events.send(SessionEvent::Finalized(result));
        });
    }

    fn complete(&mut self, result: Result<FinalizeOutcome>) {
        if self.state != RecorderState::Finalizing {
            return;
        }
        self.run_hooks(HookPhase::AfterStop);
        self.session = None;
        self.state = RecorderState::Idle;

        match &result {
            Ok(outcome) => self.collaborator.capture_saved(outcome),
            Err(e) => {
                tracing::error!("Failed to save recording: {}", e);
                self.collaborator.capture_failed(e);
            }
        }
        reply_to(self.pending_stop.take(), result);
    }

    fn schedule_start(&mut self, at: NaiveTime, request: StartRequest) -> Result<Duration> {
        request.validate()?;
        let delay = delay_until(at, Local::now().naive_local());
        let events = EventSender::new(IDLE_GENERATION, self.events_tx.clone());
        self.idle_tasks.after(TaskKind::ScheduledStart, delay, move || {
            events.send(SessionEvent::ScheduledStart(request));
        });
        tracing::info!(
            "{} scheduled for {} (in {}s)",
            request.kind.prefix(),
            at.format("%H:%M"),
            delay.as_secs()
        );
        Ok(delay)
    }

    async fn begin_shutdown(&mut self) {
        self.shutting_down = true;
        self.idle_tasks.cancel_all();
        match self.state {
            RecorderState::CountingDown => self.cancel_countdown(),
            RecorderState::Recording | RecorderState::Paused => self.begin_stop(None).await,
            _ => {}
        }
    }

    fn status(&mut self) -> RecorderStatus {
        let now = Instant::now();
        let scheduled_start = self.idle_tasks.is_scheduled(TaskKind::ScheduledStart);
        match self.session.as_mut() {
            Some(session) => RecorderStatus {
                state: self.state,
                kind: Some(session.kind()),
                elapsed: session.elapsed(now),
                elapsed_duration: Some(session.elapsed_duration(now)),
                chunks: session.chunks().len(),
                bytes: session.chunks().total_bytes(),
                zoom: session.zoom_state(),
                auto_stop_armed: session.scheduler_mut().is_scheduled(TaskKind::AutoStop),
                scheduled_start,
                missing_sources: session.missing_sources().to_vec(),
            },
            None => RecorderStatus {
                state: self.state,
                kind: self.pending.as_ref().map(|p| p.request.kind),
                elapsed: None,
                elapsed_duration: None,
                chunks: 0,
                bytes: 0,
                zoom: None,
                auto_stop_armed: false,
                scheduled_start,
                missing_sources: Vec::new(),
            },
        }
    }

    fn run_hooks(&mut self, phase: HookPhase) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let events = EventSender::new(self.generation, self.events_tx.clone());
        let (scheduler, levels, kind) = session.hook_parts();
        let mut ctx = HookContext::new(&self.settings, kind, scheduler, &events, &self.collaborator, levels);

        for hook in self.hooks.iter_mut() {
            tracing::trace!("Hook {} {:?}", hook.name(), phase);
            match phase {
                HookPhase::BeforeStart => hook.before_start(&mut ctx),
                HookPhase::AfterStart => hook.after_start(&mut ctx),
                HookPhase::BeforeStop => hook.before_stop(&mut ctx),
                HookPhase::AfterStop => hook.after_stop(&mut ctx),
            }
        }
    }
}

fn start_ticker(session: &mut CaptureSession, events: EventSender) {
    session
        .scheduler_mut()
        .every(TaskKind::ElapsedTicker, TICK_INTERVAL, move || {
            events.send(SessionEvent::Tick)
        });
}
