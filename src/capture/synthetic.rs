//! Synthetic capture sources
//!
//! Color-bar video and sine-tone audio, used when no platform capture backend
//! is wired in (dry runs, benchmarks, tests).

use super::{CaptureSourceInfo, MediaStream, SourceId, SourceKind, StreamAcquisition, StreamConstraints, VideoTrack};
use crate::audio::{AudioFormat, AudioFrame, AudioTrack, ChannelLayout};
use crate::error::{Error, Result};
use crate::types::{Frame, Framerate, Resolution, BYTES_PER_PIXEL};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BARS: [[u8; 4]; 8] = [
    [235, 235, 235, 255],
    [235, 235, 16, 255],
    [16, 235, 235, 255],
    [16, 235, 16, 255],
    [235, 16, 235, 255],
    [235, 16, 16, 255],
    [16, 16, 235, 255],
    [16, 16, 16, 255],
];

/// Render SMPTE-style color bars with a moving marker column
fn render_bars(resolution: Resolution, marker: Option<u32>) -> Frame {
    let mut frame = Frame::new(resolution.width, resolution.height);
    let width = resolution.width.max(1);
    let stride = frame.stride();

    for y in 0..resolution.height as usize {
        let row = &mut frame.data[y * stride..(y + 1) * stride];
        for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            let bar = x * BARS.len() / width as usize;
            px.copy_from_slice(&BARS[bar.min(BARS.len() - 1)]);
        }
        if let Some(mx) = marker {
            let idx = (mx % width) as usize * BYTES_PER_PIXEL;
            row[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&[255, 255, 255, 255]);
        }
    }

    frame
}

/// Video track that always shows the same frame
pub struct StillVideoTrack {
    label: String,
    frame: Frame,
    live: AtomicBool,
}

impl StillVideoTrack {
    pub fn new(label: impl Into<String>, frame: Frame) -> Self {
        Self {
            label: label.into(),
            frame,
            live: AtomicBool::new(true),
        }
    }

    /// Still color bars
    pub fn bars(label: impl Into<String>, resolution: Resolution) -> Self {
        Self::new(label, render_bars(resolution, None))
    }
}

impl VideoTrack for StillVideoTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn resolution(&self) -> Option<Resolution> {
        Some(self.frame.resolution())
    }

    fn is_ready(&self) -> bool {
        self.is_live()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn latest_frame(&self) -> Option<Frame> {
        self.is_live().then(|| self.frame.clone())
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// Animated color bars produced on a dedicated thread
pub struct TestPatternTrack {
    label: String,
    resolution: Resolution,
    live: Arc<AtomicBool>,
    frame_count: Arc<AtomicU64>,
    rx: crossbeam_channel::Receiver<Frame>,
    latest: Mutex<Option<Frame>>,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl TestPatternTrack {
    /// Start producing frames
    pub fn spawn(label: impl Into<String>, resolution: Resolution, framerate: Framerate) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<Frame>(2);
        let live = Arc::new(AtomicBool::new(true));
        let frame_count = Arc::new(AtomicU64::new(0));
        let interval = framerate.frame_interval();

        let thread_live = live.clone();
        let thread_count = frame_count.clone();
        let handle = std::thread::spawn(move || {
            let started = std::time::Instant::now();
            while thread_live.load(Ordering::SeqCst) {
                let n = thread_count.fetch_add(1, Ordering::Relaxed);
                let mut frame = render_bars(resolution, Some((n * 8) as u32));
                frame.pts = started.elapsed().as_micros() as i64;

                match tx.try_send(frame) {
                    Ok(()) | Err(crossbeam_channel::TrySendError::Full(_)) => {}
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
                }
                std::thread::sleep(interval);
            }
            tracing::debug!("Test pattern thread exiting");
        });

        Self {
            label: label.into(),
            resolution,
            live,
            frame_count,
            rx,
            latest: Mutex::new(None),
            thread: Mutex::new(Some(handle)),
        }
    }

    /// Frames produced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    fn drain(&self) {
        let mut latest = self.latest.lock();
        while let Ok(frame) = self.rx.try_recv() {
            *latest = Some(frame);
        }
    }
}

impl VideoTrack for TestPatternTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn resolution(&self) -> Option<Resolution> {
        Some(self.resolution)
    }

    fn is_ready(&self) -> bool {
        self.drain();
        self.latest.lock().is_some()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn latest_frame(&self) -> Option<Frame> {
        if !self.is_live() {
            return None;
        }
        self.drain();
        self.latest.lock().clone()
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TestPatternTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sine tone paced in real time
pub struct ToneTrack {
    label: String,
    format: AudioFormat,
    frequency: f64,
    amplitude: f32,
    phase: f64,
    chunk_frames: usize,
    next_due: Option<tokio::time::Instant>,
    pts: i64,
    live: bool,
}

impl ToneTrack {
    pub fn new(label: impl Into<String>, format: AudioFormat, frequency: f64, amplitude: f32) -> Self {
        Self {
            label: label.into(),
            format,
            frequency,
            amplitude: amplitude.clamp(0.0, 1.0),
            phase: 0.0,
            // 20 ms chunks
            chunk_frames: (format.sample_rate / 50).max(1) as usize,
            next_due: None,
            pts: 0,
            live: true,
        }
    }

    fn chunk_duration(&self) -> Duration {
        Duration::from_micros(self.chunk_frames as u64 * 1_000_000 / self.format.sample_rate.max(1) as u64)
    }
}

#[async_trait::async_trait]
impl AudioTrack for ToneTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn is_live(&self) -> bool {
        self.live
    }

    async fn next_frame(&mut self) -> Result<AudioFrame> {
        if !self.live {
            return Err(Error::TrackEnded);
        }

        let now = tokio::time::Instant::now();
        let due = *self.next_due.get_or_insert(now);
        tokio::time::sleep_until(due).await;
        self.next_due = Some(due + self.chunk_duration());

        let channels = self.format.channels() as usize;
        let step = std::f64::consts::TAU * self.frequency / self.format.sample_rate as f64;
        let mut samples = Vec::with_capacity(self.chunk_frames * channels);
        for _ in 0..self.chunk_frames {
            let value = (self.phase.sin() as f32) * self.amplitude;
            samples.extend(std::iter::repeat(value).take(channels));
            self.phase = (self.phase + step) % std::f64::consts::TAU;
        }

        let mut frame = AudioFrame::from_samples(samples, self.format);
        frame.pts = self.pts;
        self.pts += frame.duration_us();
        Ok(frame)
    }

    fn stop(&mut self) {
        self.live = false;
    }
}

/// Acquisition backed entirely by synthetic sources
#[derive(Debug, Clone)]
pub struct TestPatternAcquisition {
    screens: Vec<Resolution>,
    windows: Vec<(String, Resolution)>,
    animated: bool,
    desktop_audio: bool,
    microphone: bool,
    webcam: bool,
}

impl Default for TestPatternAcquisition {
    fn default() -> Self {
        Self {
            screens: vec![Resolution::FHD_1080P],
            windows: vec![("Terminal".to_string(), Resolution::HD_720P)],
            animated: true,
            desktop_audio: true,
            microphone: true,
            webcam: true,
        }
    }
}

impl TestPatternAcquisition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static frames instead of a producer thread
    pub fn still() -> Self {
        Self {
            animated: false,
            ..Self::default()
        }
    }

    pub fn with_screens(mut self, screens: Vec<Resolution>) -> Self {
        self.screens = screens;
        self
    }

    pub fn with_desktop_audio(mut self, available: bool) -> Self {
        self.desktop_audio = available;
        self
    }

    pub fn with_microphone(mut self, available: bool) -> Self {
        self.microphone = available;
        self
    }

    pub fn with_webcam(mut self, available: bool) -> Self {
        self.webcam = available;
        self
    }

    fn native_resolution(&self, source: &SourceId) -> Option<Resolution> {
        let index = source.index as usize;
        match source.kind {
            SourceKind::Screen => self.screens.get(index).copied(),
            SourceKind::Window => self.windows.get(index).map(|(_, r)| *r),
        }
    }

    fn video_track(&self, label: String, resolution: Resolution, framerate: Framerate) -> Arc<dyn VideoTrack> {
        if self.animated {
            Arc::new(TestPatternTrack::spawn(label, resolution, framerate))
        } else {
            Arc::new(StillVideoTrack::bars(label, resolution))
        }
    }
}

#[async_trait::async_trait]
impl StreamAcquisition for TestPatternAcquisition {
    async fn list_sources(&self) -> Result<Vec<CaptureSourceInfo>> {
        let screens = self.screens.iter().enumerate().map(|(i, r)| CaptureSourceInfo {
            id: SourceId::screen(i as u32),
            name: format!("Screen {}", i + 1),
            resolution: Some(*r),
        });
        let windows = self.windows.iter().enumerate().map(|(i, (name, r))| CaptureSourceInfo {
            id: SourceId::window(i as u32),
            name: name.clone(),
            resolution: Some(*r),
        });
        Ok(screens.chain(windows).collect())
    }

    async fn acquire_screen(
        &self,
        source: &SourceId,
        constraints: &StreamConstraints,
    ) -> Result<MediaStream> {
        let native = self
            .native_resolution(source)
            .ok_or_else(|| Error::Acquisition(format!("{} not found", source)))?;
        let resolution = native.fit_within(constraints.max_resolution);
        tracing::debug!("Synthetic {} at {}", source, resolution);

        let audio: Option<Box<dyn AudioTrack>> = (constraints.audio && self.desktop_audio).then(|| {
            Box::new(ToneTrack::new("desktop audio", AudioFormat::default(), 440.0, 0.3))
                as Box<dyn AudioTrack>
        });

        Ok(MediaStream {
            video: Some(self.video_track(source.to_string(), resolution, constraints.framerate)),
            audio,
        })
    }

    async fn acquire_microphone(&self) -> Result<Box<dyn AudioTrack>> {
        if !self.microphone {
            return Err(Error::Acquisition("No microphone available".into()));
        }
        Ok(Box::new(ToneTrack::new(
            "microphone",
            AudioFormat::new(48_000, ChannelLayout::Stereo),
            660.0,
            0.2,
        )))
    }

    async fn acquire_webcam(&self) -> Result<Arc<dyn VideoTrack>> {
        if !self.webcam {
            return Err(Error::Acquisition("No webcam available".into()));
        }
        Ok(self.video_track("webcam".into(), Resolution::new(640, 480), Framerate::FPS_30))
    }
}
