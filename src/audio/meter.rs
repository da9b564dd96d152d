//! Audio level metering

use super::{AudioFormat, AudioFrame, AudioTrack};
use crate::error::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared peak level of one track, 0..=100
#[derive(Debug, Clone, Default)]
pub struct LevelMeter {
    level: Arc<AtomicU32>,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the peak of a frame
    pub fn update(&self, frame: &AudioFrame) {
        let level = (frame.peak() * 100.0).clamp(0.0, 100.0);
        self.level.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.level.store(0.0f32.to_bits(), Ordering::Relaxed);
    }
}

/// Snapshot of the current levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AudioLevels {
    pub desktop: Option<f32>,
    pub mic: Option<f32>,
}

/// Meters for the tracks of one session
#[derive(Debug, Clone, Default)]
pub struct LevelMeters {
    pub desktop: Option<LevelMeter>,
    pub mic: Option<LevelMeter>,
}

impl LevelMeters {
    pub fn is_empty(&self) -> bool {
        self.desktop.is_none() && self.mic.is_none()
    }

    pub fn read(&self) -> AudioLevels {
        AudioLevels {
            desktop: self.desktop.as_ref().map(LevelMeter::level),
            mic: self.mic.as_ref().map(LevelMeter::level),
        }
    }
}

/// Track wrapper updating a [`LevelMeter`] with every frame
pub struct MeteredTrack {
    inner: Box<dyn AudioTrack>,
    meter: LevelMeter,
}

impl MeteredTrack {
    pub fn new(inner: Box<dyn AudioTrack>, meter: LevelMeter) -> Self {
        Self { inner, meter }
    }
}

#[async_trait::async_trait]
impl AudioTrack for MeteredTrack {
    fn label(&self) -> &str {
        self.inner.label()
    }

    fn format(&self) -> AudioFormat {
        self.inner.format()
    }

    fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    async fn next_frame(&mut self) -> Result<AudioFrame> {
        let result = self.inner.next_frame().await;
        match &result {
            Ok(frame) => self.meter.update(frame),
            Err(_) => self.meter.reset(),
        }
        result
    }

    fn stop(&mut self) {
        self.meter.reset();
        self.inner.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ChannelLayout;

    #[test]
    fn test_meter_tracks_peak() {
        let meter = LevelMeter::new();
        let format = AudioFormat::new(48_000, ChannelLayout::Stereo);
        meter.update(&AudioFrame::from_samples(vec![0.1, -0.4, 0.2, 0.0], format));
        assert!((meter.level() - 40.0).abs() < 1e-3);

        meter.update(&AudioFrame::from_samples(vec![3.0, 0.0], format));
        assert_eq!(meter.level(), 100.0);

        meter.reset();
        assert_eq!(meter.level(), 0.0);
    }

    #[test]
    fn test_levels_snapshot() {
        let meters = LevelMeters {
            desktop: None,
            mic: Some(LevelMeter::new()),
        };
        assert!(!meters.is_empty());
        assert_eq!(
            meters.read(),
            AudioLevels {
                desktop: None,
                mic: Some(0.0)
            }
        );
        assert!(LevelMeters::default().is_empty());
    }
}
