//! Live WebM encoding through an ffmpeg child process
//!
//! Raw RGBA frames go to ffmpeg's stdin, encoded WebM comes back on stdout and
//! is buffered until the next chunk is taken. When video and audio are both
//! present, audio is fed over a loopback TCP socket as a second input.

use super::{ChunkEncoder, CombinedStream, EncodeParams, EncoderFactory, VideoInput};
use crate::audio::{AudioFormat, AudioTrack};
use crate::error::{Error, Result};
use crate::types::{Frame, Framerate, Resolution, BYTES_PER_PIXEL};

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// How long ffmpeg gets to connect to the audio socket
const AUDIO_ACCEPT_TIMEOUT: Duration = Duration::from_secs(10);
/// How long ffmpeg gets to drain its inputs on finish
const FINISH_TIMEOUT: Duration = Duration::from_secs(15);

/// Factory for [`FfmpegWebmEncoder`]
#[derive(Debug, Clone)]
pub struct FfmpegWebmFactory {
    binary: PathBuf,
}

impl FfmpegWebmFactory {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl EncoderFactory for FfmpegWebmFactory {
    fn create(&self, params: &EncodeParams) -> Result<Box<dyn ChunkEncoder>> {
        Ok(Box::new(FfmpegWebmEncoder::new(&self.binary, *params)))
    }
}

/// Chunked WebM encoder backed by ffmpeg (libvpx + libopus)
pub struct FfmpegWebmEncoder {
    binary: PathBuf,
    params: EncodeParams,
    paused: Arc<AtomicBool>,
    buffer: Arc<Mutex<Vec<u8>>>,
    child: Option<Child>,
    video_task: Option<JoinHandle<()>>,
    audio_task: Option<JoinHandle<()>>,
    audio_stop: Option<oneshot::Sender<()>>,
    output_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
    bytes_out: u64,
}

impl FfmpegWebmEncoder {
    pub fn new(binary: &Path, params: EncodeParams) -> Self {
        Self {
            binary: binary.to_path_buf(),
            params,
            paused: Arc::new(AtomicBool::new(false)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            child: None,
            video_task: None,
            audio_task: None,
            audio_stop: None,
            output_task: None,
            stderr_task: None,
            bytes_out: 0,
        }
    }

    /// Total encoded bytes handed out so far
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    /// ffmpeg arguments for the given inputs
    pub fn build_args(
        &self,
        video: Option<(Resolution, Framerate)>,
        audio: Option<(AudioFormat, &str)>,
    ) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Some((resolution, framerate)) = video {
            args.extend([
                "-f".into(),
                "rawvideo".into(),
                "-pix_fmt".into(),
                "rgba".into(),
                "-s".into(),
                resolution.to_string(),
                "-r".into(),
                framerate.fps().to_string(),
                "-i".into(),
                "pipe:0".into(),
            ]);
        }

        if let Some((format, input)) = audio {
            args.extend([
                "-f".into(),
                format.ffmpeg_sample_format().into(),
                "-ar".into(),
                format.sample_rate.to_string(),
                "-ac".into(),
                format.channels().to_string(),
                "-i".into(),
                input.to_string(),
            ]);
        }

        if video.is_some() {
            args.extend([
                "-c:v".into(),
                "libvpx".into(),
                "-deadline".into(),
                "realtime".into(),
                "-cpu-used".into(),
                "8".into(),
                "-b:v".into(),
                format!("{}k", self.params.video_bitrate / 1000),
            ]);
        }
        if audio.is_some() {
            args.extend([
                "-c:a".into(),
                "libopus".into(),
                "-b:a".into(),
                format!("{}k", self.params.audio_bitrate / 1000),
            ]);
        }

        args.extend(["-f".into(), "webm".into(), "pipe:1".into()]);
        args
    }

    fn check_exit(&mut self) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            return Err(Error::EncoderNotStarted);
        };
        match child.try_wait() {
            Ok(Some(status)) if !status.success() => {
                Err(Error::Encode(format!("ffmpeg exited with {}", status)))
            }
            Ok(_) => Ok(()),
            Err(e) => Err(Error::Encode(format!("Failed to poll ffmpeg: {}", e))),
        }
    }

    fn drain_buffer(&mut self) -> Option<Vec<u8>> {
        let data = std::mem::take(&mut *self.buffer.lock());
        if data.is_empty() {
            return None;
        }
        self.bytes_out += data.len() as u64;
        Some(data)
    }
}

async fn pump_video(
    mut frames: mpsc::Receiver<Frame>,
    mut stdin: ChildStdin,
    paused: Arc<AtomicBool>,
    frame_size: usize,
) {
    while let Some(frame) = frames.recv().await {
        if paused.load(Ordering::SeqCst) {
            continue;
        }
        if frame.data.len() != frame_size {
            tracing::debug!("Dropping frame of {} bytes, expected {}", frame.data.len(), frame_size);
            continue;
        }
        if let Err(e) = stdin.write_all(&frame.data).await {
            tracing::warn!("ffmpeg video input closed: {}", e);
            break;
        }
    }
    let _ = stdin.shutdown().await;
}

async fn pump_audio<W: AsyncWrite + Unpin>(
    mut track: Box<dyn AudioTrack>,
    mut sink: W,
    paused: Arc<AtomicBool>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => break,
            frame = track.next_frame() => match frame {
                Ok(frame) => {
                    if paused.load(Ordering::SeqCst) {
                        continue;
                    }
                    if let Err(e) = sink.write_all(&frame.to_le_bytes()).await {
                        tracing::warn!("ffmpeg audio input closed: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Audio input ended: {}", e);
                    break;
                }
            },
        }
    }
    track.stop();
    let _ = sink.shutdown().await;
}

async fn collect_output<R: AsyncRead + Unpin>(mut stdout: R, buffer: Arc<Mutex<Vec<u8>>>) {
    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        match stdout.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.lock().extend_from_slice(&chunk[..n]),
            Err(e) => {
                tracing::warn!("Failed to read ffmpeg output: {}", e);
                break;
            }
        }
    }
}

async fn log_stderr<R: AsyncRead + Unpin>(stderr: R) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::warn!("ffmpeg: {}", line);
    }
}

async fn join_within(handle: Option<JoinHandle<()>>, what: &str) {
    if let Some(mut handle) = handle {
        if tokio::time::timeout(FINISH_TIMEOUT, &mut handle).await.is_err() {
            tracing::warn!("{} did not finish in time", what);
            handle.abort();
        }
    }
}

#[async_trait::async_trait]
impl ChunkEncoder for FfmpegWebmEncoder {
    async fn start(&mut self, stream: &mut CombinedStream) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::Encode("Encoder already started".into()));
        }
        if stream.video.is_none() && stream.audio.is_none() {
            return Err(Error::Encode("Nothing to encode".into()));
        }

        // Audio rides on stdin when there is no video, else on a loopback socket
        let listener = match (&stream.video, &stream.audio) {
            (Some(_), Some(_)) => Some(TcpListener::bind(("127.0.0.1", 0)).await?),
            _ => None,
        };
        let audio_input = match &listener {
            Some(l) => format!("tcp://127.0.0.1:{}", l.local_addr()?.port()),
            None => "pipe:0".to_string(),
        };

        let args = self.build_args(
            stream.video.as_ref().map(|v| (v.resolution, v.framerate)),
            stream.audio.as_ref().map(|a| (a.format(), audio_input.as_str())),
        );
        tracing::debug!("Starting encoder: {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Encode(format!("Failed to start {}: {}", self.binary.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Encode("Failed to capture ffmpeg stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Encode("Failed to capture ffmpeg stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            self.stderr_task = Some(tokio::spawn(log_stderr(stderr)));
        }

        self.output_task = Some(tokio::spawn(collect_output(stdout, self.buffer.clone())));

        let mut stdin = Some(stdin);
        if let Some(VideoInput {
            frames, resolution, ..
        }) = stream.video.take()
        {
            let frame_size = resolution.pixels() as usize * BYTES_PER_PIXEL;
            if let Some(stdin) = stdin.take() {
                self.video_task = Some(tokio::spawn(pump_video(
                    frames,
                    stdin,
                    self.paused.clone(),
                    frame_size,
                )));
            }
        }

        if let Some(track) = stream.audio.take() {
            let (stop_tx, stop_rx) = oneshot::channel();
            let paused = self.paused.clone();
            let task = match (listener, stdin.take()) {
                (Some(listener), _) => tokio::spawn(async move {
                    match tokio::time::timeout(AUDIO_ACCEPT_TIMEOUT, listener.accept()).await {
                        Ok(Ok((socket, _))) => pump_audio(track, socket, paused, stop_rx).await,
                        Ok(Err(e)) => {
                            let mut track = track;
                            tracing::warn!("Audio socket failed: {}", e);
                            track.stop();
                        }
                        Err(_) => {
                            let mut track = track;
                            tracing::warn!("ffmpeg never connected to the audio socket");
                            track.stop();
                        }
                    }
                }),
                (None, Some(stdin)) => tokio::spawn(pump_audio(track, stdin, paused, stop_rx)),
                (None, None) => {
                    stream.audio = Some(track);
                    return Err(Error::Encode("No input left for audio".into()));
                }
            };
            self.audio_stop = Some(stop_tx);
            self.audio_task = Some(task);
        }

        self.paused.store(false, Ordering::SeqCst);
        self.child = Some(child);
        tracing::info!("Encoder started (webm)");
        Ok(())
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    async fn take_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        self.check_exit()?;
        Ok(self.drain_buffer())
    }

    async fn finish(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(mut child) = self.child.take() else {
            return Err(Error::EncoderNotStarted);
        };

        if let Some(stop) = self.audio_stop.take() {
            let _ = stop.send(());
        }
        join_within(self.video_task.take(), "Video input").await;
        join_within(self.audio_task.take(), "Audio input").await;

        let status = match tokio::time::timeout(FINISH_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                tracing::warn!("Failed to wait for ffmpeg: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!("ffmpeg did not exit in time, killing it");
                let _ = child.kill().await;
                None
            }
        };

        join_within(self.output_task.take(), "Output reader").await;
        join_within(self.stderr_task.take(), "Log reader").await;

        let remaining = self.drain_buffer();
        match status {
            Some(status) if status.success() => {
                tracing::info!("Encoder finished, {} bytes total", self.bytes_out);
                Ok(remaining)
            }
            Some(status) => Err(Error::Encode(format!("ffmpeg exited with {}", status))),
            None => Err(Error::Encode("ffmpeg did not exit cleanly".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ChannelLayout;

    fn encoder() -> FfmpegWebmEncoder {
        FfmpegWebmEncoder::new(Path::new("ffmpeg"), EncodeParams::default())
    }

    #[test]
    fn test_video_only_args() {
        let args = encoder().build_args(Some((Resolution::new(1280, 720), Framerate::FPS_30)), None);
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 1280x720 -r 30 -i pipe:0"));
        assert!(joined.contains("-c:v libvpx"));
        assert!(joined.contains("-b:v 8000k"));
        assert!(!joined.contains("-c:a"));
        assert!(joined.ends_with("-f webm pipe:1"));
    }

    #[test]
    fn test_audio_and_video_args() {
        let format = AudioFormat::new(48_000, ChannelLayout::Stereo);
        let args = encoder().build_args(
            Some((Resolution::new(640, 480), Framerate::FPS_15)),
            Some((format, "tcp://127.0.0.1:5000")),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-f f32le -ar 48000 -ac 2 -i tcp://127.0.0.1:5000"));
        assert!(joined.contains("-c:a libopus -b:a 128k"));
        let video_input = joined.find("pipe:0").unwrap();
        let audio_input = joined.find("tcp://").unwrap();
        assert!(video_input < audio_input);
    }

    #[test]
    fn test_audio_only_uses_stdin() {
        let format = AudioFormat::new(44_100, ChannelLayout::Mono);
        let args = encoder().build_args(None, Some((format, "pipe:0")));
        let joined = args.join(" ");
        assert!(joined.contains("-ac 1 -i pipe:0"));
        assert!(!joined.contains("libvpx"));
    }

    #[tokio::test]
    async fn test_take_chunk_before_start() {
        let mut enc = encoder();
        assert!(matches!(enc.take_chunk().await, Err(Error::EncoderNotStarted)));
        assert!(matches!(enc.finish().await, Err(Error::EncoderNotStarted)));
    }

    #[tokio::test]
    async fn test_start_without_inputs_fails() {
        let mut enc = encoder();
        let mut stream = CombinedStream {
            video: None,
            audio: None,
        };
        assert!(matches!(enc.start(&mut stream).await, Err(Error::Encode(_))));
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_audio_with_caller() {
        let (track, stopped) = crate::testing::FlagTrack::new();
        let mut enc = FfmpegWebmEncoder::new(
            Path::new("/nonexistent/ffmpeg-binary"),
            EncodeParams::default(),
        );
        let mut stream = CombinedStream {
            video: None,
            audio: Some(Box::new(track)),
        };
        assert!(matches!(enc.start(&mut stream).await, Err(Error::Encode(_))));
        assert!(stream.audio.is_some());
        assert!(!stopped.load(Ordering::SeqCst));
    }
}
