//! Encoding module
//!
//! Two stages:
//! - live chunked encoding of the composited stream into WebM ([`ChunkEncoder`])
//! - post-recording transcoding into the deliverable format ([`Transcoder`])
//!
//! Both run ffmpeg out of process.

mod profile;
mod transcode;
mod webm;

pub use profile::ConversionProfile;
pub use transcode::{probe_ffmpeg, FfmpegInfo, FfmpegTranscoder, Transcoder};
pub use webm::{FfmpegWebmEncoder, FfmpegWebmFactory};

use crate::audio::AudioTrack;
use crate::config::QualityTier;
use crate::error::Result;
use crate::types::{Frame, Framerate, Resolution};
use tokio::sync::mpsc;

/// Input to a chunk encoder: composited video and/or one audio track
pub struct CombinedStream {
    pub video: Option<VideoInput>,
    pub audio: Option<Box<dyn AudioTrack>>,
}

/// Composited frames and their geometry
pub struct VideoInput {
    pub frames: mpsc::Receiver<Frame>,
    pub resolution: Resolution,
    pub framerate: Framerate,
}

/// Live encoder parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    /// Target video bitrate in bits/sec
    pub video_bitrate: u32,
    /// Audio bitrate in bits/sec
    pub audio_bitrate: u32,
}

impl EncodeParams {
    pub fn for_tier(tier: QualityTier) -> Self {
        Self {
            video_bitrate: tier.video_bitrate(),
            audio_bitrate: 128_000,
        }
    }
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self::for_tier(QualityTier::default())
    }
}

/// Chunked WebM encoder for one recording
#[async_trait::async_trait]
pub trait ChunkEncoder: Send {
    /// Start encoding the stream.
    ///
    /// Takes the inputs it encodes out of `stream`. On error, inputs still
    /// left in `stream` belong to the caller; an input already taken has
    /// been stopped.
    async fn start(&mut self, stream: &mut CombinedStream) -> Result<()>;

    /// Stop consuming input until resumed
    fn pause(&mut self);

    fn resume(&mut self);

    /// Encoded bytes produced since the last call, if any
    async fn take_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Flush the encoder and return the remaining bytes
    async fn finish(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Creates one encoder per recording
pub trait EncoderFactory: Send + Sync {
    fn create(&self, params: &EncodeParams) -> Result<Box<dyn ChunkEncoder>>;
}
