//! Capture session: the tracks, compositor, encoder and timers of one recording

use super::chunks::ChunkSequence;
use super::machine::StartRequest;
use super::scheduler::{Scheduler, TaskKind};
use super::state::{ElapsedTime, TimerState};
use crate::audio::{mix_sources, AudioTrack, LevelMeter, LevelMeters, MeteredTrack};
use crate::capture::{MediaStream, StreamAcquisition, StreamConstraints, VideoTrack};
use crate::config::{CaptureKind, OutputFormat, QualityTier, Settings};
use crate::encode::{ChunkEncoder, CombinedStream, EncodeParams, EncoderFactory, VideoInput};
use crate::error::{Error, Result};
use crate::processing::{Compositor, WebcamOverlayConfig, ZoomController, ZoomGesture, ZoomState};
use crate::types::Frame;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Composited frames buffered between the draw loop and the encoder
const FRAME_QUEUE: usize = 4;

/// Grants at most one live capture session at a time.
///
/// Clones share the same slot, so several recorders built from one factory
/// exclude each other.
#[derive(Debug, Clone, Default)]
pub struct SessionFactory {
    active: Arc<AtomicBool>,
}

impl SessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the session slot
    pub fn try_acquire(&self) -> Result<SessionGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::SessionActive)?;
        Ok(SessionGuard {
            active: self.active.clone(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Holds the session slot; released on drop
#[derive(Debug)]
pub struct SessionGuard {
    active: Arc<AtomicBool>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Everything owned by one recording
pub(crate) struct CaptureSession {
    _guard: SessionGuard,
    kind: CaptureKind,
    format: OutputFormat,
    tier: QualityTier,
    timer: Option<TimerState>,
    chunks: ChunkSequence,
    zoom: ZoomController,
    zoom_tx: Option<watch::Sender<ZoomState>>,
    overlay_tx: Option<watch::Sender<WebcamOverlayConfig>>,
    scheduler: Scheduler,
    encoder: Box<dyn ChunkEncoder>,
    video_tracks: Vec<Arc<dyn VideoTrack>>,
    levels: LevelMeters,
    missing: Vec<&'static str>,
}

/// Tracks acquired so far; stopped unless handed over
#[derive(Default)]
struct Acquired {
    video: Vec<Arc<dyn VideoTrack>>,
    audio: Option<Box<dyn AudioTrack>>,
    levels: LevelMeters,
    /// Optional sources that could not be opened
    missing: Vec<&'static str>,
}

impl Acquired {
    fn release(mut self) {
        for track in &self.video {
            track.stop();
        }
        if let Some(audio) = &mut self.audio {
            audio.stop();
        }
    }
}

fn metered(track: Box<dyn AudioTrack>, slot: &mut Option<LevelMeter>) -> Box<dyn AudioTrack> {
    let meter = LevelMeter::new();
    *slot = Some(meter.clone());
    Box::new(MeteredTrack::new(track, meter))
}

impl CaptureSession {
    /// Acquire tracks and start encoding.
    ///
    /// Desktop audio, microphone and webcam are optional: when one fails the
    /// session continues without it. Any other failure stops whatever was
    /// already acquired.
    pub async fn open(
        guard: SessionGuard,
        request: &StartRequest,
        settings: &Settings,
        acquisition: &dyn StreamAcquisition,
        encoders: &dyn EncoderFactory,
    ) -> Result<Self> {
        let kind = request.kind;
        let tier = settings.video_quality;
        let framerate = settings.framerate();

        let mut acquired = Acquired::default();
        let mut compositor = None;

        if kind.has_video() {
            let source = request
                .source
                .ok_or_else(|| Error::Acquisition("no capture source selected".into()))?;
            let constraints = StreamConstraints {
                max_resolution: tier.resolution_ceiling(),
                framerate,
                audio: settings.record_audio,
            };
            let MediaStream { video, audio: desktop } =
                acquisition.acquire_screen(&source, &constraints).await?;
            let Some(screen) = video else {
                if let Some(mut desktop) = desktop {
                    desktop.stop();
                }
                return Err(Error::Acquisition(format!("{} has no video track", source)));
            };
            acquired.video.push(screen.clone());

            let webcam = if settings.webcam.enabled {
                match acquisition.acquire_webcam().await {
                    Ok(cam) => {
                        acquired.video.push(cam.clone());
                        Some(cam)
                    }
                    Err(e) => {
                        tracing::warn!("Recording without webcam: {}", e);
                        acquired.missing.push("webcam");
                        None
                    }
                }
            } else {
                None
            };

            let mic = if settings.record_mic {
                match acquisition.acquire_microphone().await {
                    Ok(mic) => Some(mic),
                    Err(e) => {
                        tracing::warn!("{}", Error::MixingDegradation(format!("microphone: {}", e)));
                        acquired.missing.push("microphone");
                        None
                    }
                }
            } else {
                None
            };

            if settings.record_audio && desktop.is_none() {
                tracing::warn!(
                    "{}",
                    Error::MixingDegradation(format!("{} has no desktop audio", source))
                );
                acquired.missing.push("desktop audio");
            }

            let desktop = desktop.map(|t| metered(t, &mut acquired.levels.desktop));
            let mic = mic.map(|t| metered(t, &mut acquired.levels.mic));
            acquired.audio = mix_sources(desktop, mic);

            match Compositor::new(screen, webcam, framerate) {
                Ok(c) => compositor = Some(c),
                Err(e) => {
                    acquired.release();
                    return Err(e);
                }
            }
        } else {
            let mic = acquisition.acquire_microphone().await?;
            let mic = metered(mic, &mut acquired.levels.mic);
            acquired.audio = mix_sources(None, Some(mic));
        }

        let mut encoder = match encoders.create(&EncodeParams::for_tier(tier)) {
            Ok(encoder) => encoder,
            Err(e) => {
                acquired.release();
                return Err(e);
            }
        };

        let Acquired {
            video: video_tracks,
            audio,
            levels,
            missing,
        } = acquired;

        let mut scheduler = Scheduler::new();
        let mut frames_tx: Option<mpsc::Sender<Frame>> = None;
        let mut video_input = None;
        if let Some(compositor) = &compositor {
            let (tx, rx) = mpsc::channel(FRAME_QUEUE);
            frames_tx = Some(tx);
            video_input = Some(VideoInput {
                frames: rx,
                resolution: compositor.surface(),
                framerate,
            });
        }

        let mut stream = CombinedStream {
            video: video_input,
            audio,
        };
        if let Err(e) = encoder.start(&mut stream).await {
            for track in &video_tracks {
                track.stop();
            }
            if let Some(audio) = &mut stream.audio {
                audio.stop();
            }
            return Err(e);
        }

        let overlay = WebcamOverlayConfig::new(settings.webcam.enabled, settings.webcam.position);
        let (zoom_tx, overlay_tx) = match (compositor, frames_tx) {
            (Some(compositor), Some(frames_tx)) => {
                let (zoom_tx, zoom_rx) = watch::channel(ZoomState::default());
                let (overlay_tx, overlay_rx) = watch::channel(overlay);
                scheduler.spawn(TaskKind::DrawLoop, async move {
                    compositor.run(zoom_rx, overlay_rx, frames_tx).await;
                });
                (Some(zoom_tx), Some(overlay_tx))
            }
            _ => (None, None),
        };

        Ok(Self {
            _guard: guard,
            kind,
            format: kind.target_format(settings.output_format),
            tier,
            timer: None,
            chunks: ChunkSequence::new(),
            zoom: ZoomController::default(),
            zoom_tx,
            overlay_tx,
            scheduler,
            encoder,
            video_tracks,
            levels,
            missing,
        })
    }

    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    /// Capture kind, final format and quality tier
    pub fn output(&self) -> (CaptureKind, OutputFormat, QualityTier) {
        (self.kind, self.format, self.tier)
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Scheduler and meters, borrowed together for hooks
    pub fn hook_parts(&mut self) -> (&mut Scheduler, &LevelMeters, CaptureKind) {
        (&mut self.scheduler, &self.levels, self.kind)
    }

    /// Optional sources the recording goes on without
    pub fn missing_sources(&self) -> &[&'static str] {
        &self.missing
    }

    pub fn chunks(&self) -> &ChunkSequence {
        &self.chunks
    }

    /// Start the recording clock
    pub fn begin(&mut self, now: Instant) {
        self.timer = Some(TimerState::start(now));
    }

    pub fn elapsed(&self, now: Instant) -> Option<ElapsedTime> {
        self.timer.map(|t| t.snapshot(now))
    }

    pub fn elapsed_duration(&self, now: Instant) -> Duration {
        self.timer.map(|t| t.elapsed(now)).unwrap_or_default()
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(timer) = &mut self.timer {
            timer.pause(now);
        }
        self.encoder.pause();
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(timer) = &mut self.timer {
            timer.resume(now);
        }
        self.encoder.resume();
    }

    /// Move newly encoded bytes into the chunk sequence
    pub async fn flush(&mut self) -> Result<()> {
        if let Some(chunk) = self.encoder.take_chunk().await? {
            self.chunks.push(chunk);
        }
        Ok(())
    }

    /// Apply a zoom gesture; no-op for audio captures
    pub fn apply_zoom(&mut self, gesture: ZoomGesture) -> Option<ZoomState> {
        let tx = self.zoom_tx.as_ref()?;
        if self.zoom.apply(gesture) {
            tx.send_replace(self.zoom.state());
        }
        Some(self.zoom.state())
    }

    pub fn zoom_state(&self) -> Option<ZoomState> {
        self.zoom_tx.as_ref().map(|_| self.zoom.state())
    }

    /// Update webcam placement while recording
    pub fn set_overlay(&mut self, config: WebcamOverlayConfig) {
        if let Some(tx) = &self.overlay_tx {
            tx.send_replace(config);
        }
    }

    /// Cancel timers, flush the encoder and release the video tracks.
    ///
    /// The final chunk is kept even when the encoder reports an error.
    pub async fn stop_capture(&mut self) -> Result<()> {
        self.scheduler.cancel_all();
        let result = match self.encoder.finish().await {
            Ok(Some(chunk)) => {
                self.chunks.push(chunk);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        for track in &self.video_tracks {
            track.stop();
        }
        self.zoom.clear();
        result
    }

    pub fn take_chunks(&mut self) -> ChunkSequence {
        std::mem::take(&mut self.chunks)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
        for track in &self.video_tracks {
            track.stop();
        }
    }
}
