//! Fakes shared by unit tests

use crate::audio::{AudioFormat, AudioFrame, AudioTrack};
use crate::capture::{
    CaptureSourceInfo, MediaStream, SourceId, StreamAcquisition, StreamConstraints,
    TestPatternAcquisition, VideoTrack,
};
use crate::encode::{ChunkEncoder, CombinedStream, ConversionProfile, EncodeParams, EncoderFactory, Transcoder};
use crate::error::{Error, Result};
use crate::notify::StatusEvent;

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Copies input to output, or fails leaving a partial file behind
pub struct FakeTranscoder {
    fail: bool,
    pub seen: Mutex<Vec<(Vec<u8>, PathBuf)>>,
}

impl FakeTranscoder {
    pub fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, _profile: &ConversionProfile) -> Result<()> {
        let data = tokio::fs::read(input).await?;
        self.seen.lock().push((data.clone(), output.to_path_buf()));
        if self.fail {
            tokio::fs::write(output, b"partial").await?;
            return Err(Error::Encode("ffmpeg exited with exit status: 1".into()));
        }
        tokio::fs::write(output, data).await?;
        Ok(())
    }
}

/// What the fake encoders saw
#[derive(Default)]
pub struct EncoderLog {
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
    pub frames: AtomicUsize,
    pub had_audio: AtomicBool,
    pub had_video: AtomicBool,
    pub chunks: Mutex<Vec<Vec<u8>>>,
}

/// How a [`FakeEncoder`] behaves
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeEncoderMode {
    /// `take_chunk` fails on this chunk number
    pub fail_at: Option<usize>,
    /// `start` fails without taking any input
    pub fail_start: bool,
    /// Keep producing chunks while paused
    pub emit_while_paused: bool,
}

/// Emits `chunk-N;` per flush while not paused, `final;` on finish
pub struct FakeEncoder {
    log: Arc<EncoderLog>,
    paused: Arc<AtomicBool>,
    seq: usize,
    mode: FakeEncoderMode,
    audio: Option<Box<dyn AudioTrack>>,
    drain: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl ChunkEncoder for FakeEncoder {
    async fn start(&mut self, stream: &mut CombinedStream) -> Result<()> {
        if self.mode.fail_start {
            return Err(Error::Encode("Failed to start ffmpeg".into()));
        }
        self.log.started.fetch_add(1, Ordering::SeqCst);
        self.log.had_audio.store(stream.audio.is_some(), Ordering::SeqCst);
        self.log.had_video.store(stream.video.is_some(), Ordering::SeqCst);
        self.audio = stream.audio.take();
        if let Some(mut video) = stream.video.take() {
            let log = self.log.clone();
            let paused = self.paused.clone();
            self.drain = Some(tokio::spawn(async move {
                while video.frames.recv().await.is_some() {
                    if !paused.load(Ordering::SeqCst) {
                        log.frames.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    async fn take_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.paused.load(Ordering::SeqCst) && !self.mode.emit_while_paused {
            return Ok(None);
        }
        self.seq += 1;
        if self.mode.fail_at == Some(self.seq) {
            return Err(Error::Encode("encoder process exited".into()));
        }
        let chunk = format!("chunk-{};", self.seq).into_bytes();
        self.log.chunks.lock().push(chunk.clone());
        Ok(Some(chunk))
    }

    async fn finish(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
        if let Some(audio) = &mut self.audio {
            audio.stop();
        }
        self.log.finished.fetch_add(1, Ordering::SeqCst);
        let chunk = b"final;".to_vec();
        self.log.chunks.lock().push(chunk.clone());
        Ok(Some(chunk))
    }
}

#[derive(Default)]
pub struct FakeEncoderFactory {
    pub log: Arc<EncoderLog>,
    pub mode: FakeEncoderMode,
}

impl FakeEncoderFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_mode(mode: FakeEncoderMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            ..Self::default()
        })
    }

    pub fn failing_at(seq: usize) -> Arc<Self> {
        Self::with_mode(FakeEncoderMode {
            fail_at: Some(seq),
            ..FakeEncoderMode::default()
        })
    }
}

impl EncoderFactory for FakeEncoderFactory {
    fn create(&self, _params: &EncodeParams) -> Result<Box<dyn ChunkEncoder>> {
        Ok(Box::new(FakeEncoder {
            log: self.log.clone(),
            paused: Arc::new(AtomicBool::new(false)),
            seq: 0,
            mode: self.mode,
            audio: None,
            drain: None,
        }))
    }
}

/// Silent audio track that records whether it was stopped
pub struct FlagTrack {
    stopped: Arc<AtomicBool>,
}

impl FlagTrack {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let stopped = Arc::new(AtomicBool::new(false));
        (
            Self {
                stopped: stopped.clone(),
            },
            stopped,
        )
    }
}

#[async_trait::async_trait]
impl AudioTrack for FlagTrack {
    fn label(&self) -> &str {
        "flag"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::default()
    }

    fn is_live(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    async fn next_frame(&mut self) -> Result<AudioFrame> {
        if !self.is_live() {
            return Err(Error::TrackEnded);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(AudioFrame::silence(960, AudioFormat::default()))
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Test-pattern acquisition whose microphone is a [`FlagTrack`]
pub struct FlaggedMicAcquisition {
    inner: TestPatternAcquisition,
    mic: Mutex<Option<FlagTrack>>,
}

impl FlaggedMicAcquisition {
    /// The acquisition and the mic's stopped flag
    pub fn new(inner: TestPatternAcquisition) -> (Self, Arc<AtomicBool>) {
        let (mic, stopped) = FlagTrack::new();
        (
            Self {
                inner,
                mic: Mutex::new(Some(mic)),
            },
            stopped,
        )
    }
}

#[async_trait::async_trait]
impl StreamAcquisition for FlaggedMicAcquisition {
    async fn list_sources(&self) -> Result<Vec<CaptureSourceInfo>> {
        self.inner.list_sources().await
    }

    async fn acquire_screen(
        &self,
        source: &SourceId,
        constraints: &StreamConstraints,
    ) -> Result<MediaStream> {
        self.inner.acquire_screen(source, constraints).await
    }

    async fn acquire_microphone(&self) -> Result<Box<dyn AudioTrack>> {
        match self.mic.lock().take() {
            Some(mic) => Ok(Box::new(mic)),
            None => Err(Error::Acquisition("Microphone already in use".into())),
        }
    }

    async fn acquire_webcam(&self) -> Result<Arc<dyn VideoTrack>> {
        self.inner.acquire_webcam().await
    }
}

/// Everything currently buffered on a status receiver
pub fn drain(rx: &mut broadcast::Receiver<StatusEvent>) -> Vec<StatusEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Let spawned tasks run without advancing time
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
