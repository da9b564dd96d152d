//! Stream acquisition
//!
//! The recorder never talks to a platform capture API directly. Everything it
//! needs comes through [`StreamAcquisition`]:
//! - enumerating screens and windows
//! - opening a display stream (video plus optional desktop audio)
//! - opening the microphone and the webcam

mod synthetic;

pub use synthetic::{StillVideoTrack, TestPatternAcquisition, TestPatternTrack, ToneTrack};

use crate::audio::AudioTrack;
use crate::error::{Error, Result};
use crate::types::{Frame, Framerate, Resolution};
use std::sync::Arc;

/// Kind of capturable display source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Full monitor
    Screen,
    /// Application window
    Window,
}

impl SourceKind {
    fn prefix(&self) -> &'static str {
        match self {
            SourceKind::Screen => "screen",
            SourceKind::Window => "window",
        }
    }
}

/// Source identifier, rendered as `screen:<n>` or `window:<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId {
    pub kind: SourceKind,
    pub index: u32,
}

impl SourceId {
    pub fn screen(index: u32) -> Self {
        Self {
            kind: SourceKind::Screen,
            index,
        }
    }

    pub fn window(index: u32) -> Self {
        Self {
            kind: SourceKind::Window,
            index,
        }
    }
}

impl std::str::FromStr for SourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, index) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidSource(s.to_string()))?;
        let kind = match prefix {
            "screen" => SourceKind::Screen,
            "window" => SourceKind::Window,
            _ => return Err(Error::InvalidSource(s.to_string())),
        };
        let index = index
            .parse()
            .map_err(|_| Error::InvalidSource(s.to_string()))?;
        Ok(Self { kind, index })
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.index)
    }
}

/// Capture source info
#[derive(Debug, Clone)]
pub struct CaptureSourceInfo {
    /// Source ID
    pub id: SourceId,
    /// Display name
    pub name: String,
    /// Resolution if known
    pub resolution: Option<Resolution>,
}

/// Keep only sources of one kind, in listing order
pub fn filter_sources(sources: &[CaptureSourceInfo], kind: SourceKind) -> Vec<CaptureSourceInfo> {
    sources
        .iter()
        .filter(|s| s.id.kind == kind)
        .cloned()
        .collect()
}

/// Constraints for opening a display stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConstraints {
    /// Capture is scaled down to fit this ceiling
    pub max_resolution: Resolution,
    pub framerate: Framerate,
    /// Also capture desktop audio
    pub audio: bool,
}

/// A live video track
pub trait VideoTrack: Send + Sync {
    fn label(&self) -> &str;

    /// Native track resolution, once known
    fn resolution(&self) -> Option<Resolution>;

    /// Has the track produced enough data to draw from?
    fn is_ready(&self) -> bool;

    /// Is the track still delivering frames?
    fn is_live(&self) -> bool;

    /// Most recent frame, if any
    fn latest_frame(&self) -> Option<Frame>;

    /// Stop the track and release the device
    fn stop(&self);
}

/// Tracks returned for one display source
pub struct MediaStream {
    pub video: Option<Arc<dyn VideoTrack>>,
    pub audio: Option<Box<dyn AudioTrack>>,
}

impl MediaStream {
    /// Stop every track in the stream
    pub fn stop_all(&mut self) {
        if let Some(video) = &self.video {
            video.stop();
        }
        if let Some(audio) = &mut self.audio {
            audio.stop();
        }
    }
}

/// Source of every media track the recorder uses
#[async_trait::async_trait]
pub trait StreamAcquisition: Send + Sync {
    /// Enumerate screens and windows
    async fn list_sources(&self) -> Result<Vec<CaptureSourceInfo>>;

    /// Open a display stream
    async fn acquire_screen(
        &self,
        source: &SourceId,
        constraints: &StreamConstraints,
    ) -> Result<MediaStream>;

    /// Open the default microphone
    async fn acquire_microphone(&self) -> Result<Box<dyn AudioTrack>>;

    /// Open the default webcam
    async fn acquire_webcam(&self) -> Result<Arc<dyn VideoTrack>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_parse() {
        let id: SourceId = "screen:2".parse().unwrap();
        assert_eq!(id, SourceId::screen(2));
        assert_eq!(id.to_string(), "screen:2");
        assert_eq!("window:15".parse::<SourceId>().unwrap(), SourceId::window(15));

        for bad in ["screen", "tab:1", "window:x", ""] {
            assert!(matches!(bad.parse::<SourceId>(), Err(Error::InvalidSource(_))));
        }
    }

    #[test]
    fn test_filter_keeps_order() {
        let info = |id: SourceId| CaptureSourceInfo {
            id,
            name: id.to_string(),
            resolution: None,
        };
        let sources = vec![
            info(SourceId::screen(0)),
            info(SourceId::window(4)),
            info(SourceId::screen(1)),
            info(SourceId::window(2)),
        ];
        let windows = filter_sources(&sources, SourceKind::Window);
        assert_eq!(
            windows.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![SourceId::window(4), SourceId::window(2)]
        );
        assert_eq!(filter_sources(&sources, SourceKind::Screen).len(), 2);
    }
}
