//! Audio types

use serde::{Deserialize, Serialize};

/// Audio channel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChannelLayout {
    /// Mono (1 channel)
    Mono,
    /// Stereo (2 channels)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Number of channels
    pub fn channels(&self) -> u32 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// FFmpeg channel layout string
    pub fn ffmpeg_layout(&self) -> &'static str {
        match self {
            ChannelLayout::Mono => "mono",
            ChannelLayout::Stereo => "stereo",
        }
    }
}

/// Sample rate and layout of a track; samples are always interleaved f32
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub layout: ChannelLayout,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            layout,
        }
    }

    pub fn channels(&self) -> u32 {
        self.layout.channels()
    }

    /// FFmpeg raw input sample format
    pub fn ffmpeg_sample_format(&self) -> &'static str {
        "f32le"
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(48_000, ChannelLayout::Stereo)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz {}", self.sample_rate, self.layout.ffmpeg_layout())
    }
}

/// Audio frame containing interleaved f32 samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Interleaved samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    pub format: AudioFormat,
    /// Presentation timestamp in microseconds
    pub pts: i64,
}

impl AudioFrame {
    /// Create a frame of silence
    pub fn silence(frames: usize, format: AudioFormat) -> Self {
        Self {
            samples: vec![0.0; frames * format.channels() as usize],
            format,
            pts: 0,
        }
    }

    pub fn from_samples(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self {
            samples,
            format,
            pts: 0,
        }
    }

    /// Number of samples per channel
    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels().max(1) as usize
    }

    /// Duration in microseconds based on sample count and rate
    pub fn duration_us(&self) -> i64 {
        (self.frames() as i64 * 1_000_000) / self.format.sample_rate.max(1) as i64
    }

    /// Peak absolute amplitude
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Root mean square amplitude
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f32).sqrt()
    }

    /// Little-endian f32 bytes, as fed to the encoder
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 4);
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }
}
