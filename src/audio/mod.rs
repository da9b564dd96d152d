//! Audio tracks and mixing
//!
//! Provides:
//! - the [`AudioTrack`] abstraction every audio source implements
//! - desktop + microphone mixing into one track
//! - level metering

mod meter;
mod mixer;
mod types;

pub use meter::{AudioLevels, LevelMeter, LevelMeters, MeteredTrack};
pub use mixer::{mix_sources, MixedTrack};
pub use types::{AudioFormat, AudioFrame, ChannelLayout};

use crate::error::Result;

/// A live audio track producing interleaved f32 frames
#[async_trait::async_trait]
pub trait AudioTrack: Send {
    fn label(&self) -> &str;

    /// Sample rate and channel layout
    fn format(&self) -> AudioFormat;

    /// Is the track still delivering samples?
    fn is_live(&self) -> bool;

    /// Next frame; `Error::TrackEnded` once the source is gone
    async fn next_frame(&mut self) -> Result<AudioFrame>;

    /// Stop the track and release the device
    fn stop(&mut self);
}
