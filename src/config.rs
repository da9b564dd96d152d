//! Configuration types for SnapRec

use crate::error::{Error, Result};
use crate::processing::PipPosition;
use crate::types::{Framerate, Resolution};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Quality tier selecting capture ceiling, bitrate and encoder parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [QualityTier::High, QualityTier::Medium, QualityTier::Low];

    /// Maximum capture / output resolution
    pub fn resolution_ceiling(&self) -> Resolution {
        match self {
            QualityTier::High => Resolution::FHD_1080P,
            QualityTier::Medium => Resolution::HD_720P,
            QualityTier::Low => Resolution::SD_480P,
        }
    }

    /// Target video bitrate in bits/sec
    pub fn video_bitrate(&self) -> u32 {
        match self {
            QualityTier::High => 8_000_000,
            QualityTier::Medium => 4_000_000,
            QualityTier::Low => 2_000_000,
        }
    }

    /// x264 constant rate factor
    pub fn crf(&self) -> u8 {
        match self {
            QualityTier::High => 18,
            QualityTier::Medium => 23,
            QualityTier::Low => 28,
        }
    }

    /// x264 speed preset
    pub fn x264_preset(&self) -> &'static str {
        match self {
            QualityTier::High => "slow",
            QualityTier::Medium => "medium",
            QualityTier::Low => "fast",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// Deliverable file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
    Gif,
    Mp3,
    Png,
}

impl OutputFormat {
    /// Get file extension
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Gif => "gif",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Png => "png",
        }
    }

    /// Formats written as-is, without a transcoding step
    pub fn is_passthrough(&self) -> bool {
        matches!(self, OutputFormat::Webm | OutputFormat::Png)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.extension())
    }
}

/// What is being captured; also the file name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    Screenshot,
    Recording,
    Gif,
    Audio,
    Snip,
}

impl CaptureKind {
    /// File name prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            CaptureKind::Screenshot => "screenshot",
            CaptureKind::Recording => "recording",
            CaptureKind::Gif => "gif",
            CaptureKind::Audio => "audio",
            CaptureKind::Snip => "snip",
        }
    }

    /// Final format for this kind; `video_format` is the configured recording format
    pub fn target_format(&self, video_format: OutputFormat) -> OutputFormat {
        match self {
            CaptureKind::Screenshot | CaptureKind::Snip => OutputFormat::Png,
            CaptureKind::Recording => video_format,
            CaptureKind::Gif => OutputFormat::Gif,
            CaptureKind::Audio => OutputFormat::Mp3,
        }
    }

    /// Does this kind go through the compositor?
    pub fn has_video(&self) -> bool {
        matches!(self, CaptureKind::Recording | CaptureKind::Gif)
    }
}

/// Cursor/click/keyboard effect toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EffectsSettings {
    pub cursor_highlight: bool,
    pub click_effects: bool,
    pub keyboard_overlay: bool,
}

impl EffectsSettings {
    /// Is any effect enabled?
    pub fn any(&self) -> bool {
        self.cursor_highlight || self.click_effects || self.keyboard_overlay
    }
}

/// Webcam picture-in-picture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WebcamSettings {
    pub enabled: bool,
    pub position: PipPosition,
}

/// Recorder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory receiving every saved artifact
    pub save_path: PathBuf,
    /// Quality tier
    pub video_quality: QualityTier,
    /// Compositor / capture framerate
    pub fps: u32,
    /// Capture desktop (system) audio
    pub record_audio: bool,
    /// Capture microphone
    pub record_mic: bool,
    /// Final format for screen recordings (mp4 or webm)
    pub output_format: OutputFormat,
    /// Countdown before recording, in seconds (0 = none)
    pub countdown_secs: u32,
    /// Auto-stop after this many minutes (0 = never)
    pub auto_stop_minutes: u32,
    /// Show the floating elapsed-time overlay
    pub show_timer_overlay: bool,
    pub effects: EffectsSettings,
    pub webcam: WebcamSettings,
    /// ffmpeg binary used for transcoding
    pub ffmpeg_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            video_quality: QualityTier::High,
            fps: 30,
            record_audio: true,
            record_mic: true,
            output_format: OutputFormat::Mp4,
            countdown_secs: 0,
            auto_stop_minutes: 0,
            show_timer_overlay: false,
            effects: EffectsSettings::default(),
            webcam: WebcamSettings::default(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let settings: Settings = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("Invalid settings {}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write settings as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Check values a recording depends on
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 || self.fps > 240 {
            return Err(Error::Config(format!("fps out of range: {}", self.fps)));
        }
        if !matches!(self.output_format, OutputFormat::Mp4 | OutputFormat::Webm) {
            return Err(Error::Config(format!(
                "recordings must be mp4 or webm, got {}",
                self.output_format
            )));
        }
        Ok(())
    }

    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    pub fn with_quality(mut self, tier: QualityTier) -> Self {
        self.video_quality = tier;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_audio(mut self, desktop: bool, mic: bool) -> Self {
        self.record_audio = desktop;
        self.record_mic = mic;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_countdown(mut self, secs: u32) -> Self {
        self.countdown_secs = secs;
        self
    }

    pub fn with_auto_stop_minutes(mut self, minutes: u32) -> Self {
        self.auto_stop_minutes = minutes;
        self
    }

    pub fn with_webcam(mut self, enabled: bool, position: PipPosition) -> Self {
        self.webcam = WebcamSettings { enabled, position };
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Compositor framerate
    pub fn framerate(&self) -> Framerate {
        Framerate::new(self.fps.max(1), 1)
    }

    /// Countdown length
    pub fn countdown(&self) -> Duration {
        Duration::from_secs(self.countdown_secs as u64)
    }

    /// Auto-stop deadline, if configured
    pub fn auto_stop(&self) -> Option<Duration> {
        (self.auto_stop_minutes > 0).then(|| Duration::from_secs(self.auto_stop_minutes as u64 * 60))
    }
}

fn default_save_path() -> PathBuf {
    dirs::video_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("SnapRec")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_table() {
        assert_eq!(QualityTier::High.resolution_ceiling(), Resolution::new(1920, 1080));
        assert_eq!(QualityTier::Medium.resolution_ceiling(), Resolution::new(1280, 720));
        assert_eq!(QualityTier::Low.resolution_ceiling(), Resolution::new(854, 480));
        assert_eq!(QualityTier::High.video_bitrate(), 8_000_000);
        assert_eq!(QualityTier::Medium.video_bitrate(), 4_000_000);
        assert_eq!(QualityTier::Low.video_bitrate(), 2_000_000);
    }

    #[test]
    fn test_kind_target_format() {
        assert_eq!(CaptureKind::Recording.target_format(OutputFormat::Webm), OutputFormat::Webm);
        assert_eq!(CaptureKind::Gif.target_format(OutputFormat::Mp4), OutputFormat::Gif);
        assert_eq!(CaptureKind::Audio.target_format(OutputFormat::Mp4), OutputFormat::Mp3);
        assert_eq!(CaptureKind::Snip.target_format(OutputFormat::Mp4), OutputFormat::Png);
        assert!(!CaptureKind::Audio.has_video());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            fps = 60
            video_quality = "low"

            [webcam]
            enabled = true
            position = "top-left"
            "#,
        )
        .unwrap();
        assert_eq!(settings.fps, 60);
        assert_eq!(settings.video_quality, QualityTier::Low);
        assert!(settings.webcam.enabled);
        assert_eq!(settings.webcam.position, PipPosition::TopLeft);
        assert_eq!(settings.output_format, OutputFormat::Mp4);
        assert!(settings.record_mic);
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let settings = Settings::default()
            .with_save_path(dir.path())
            .with_countdown(3)
            .with_auto_stop_minutes(2);
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.auto_stop(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_validate_checks_builder_values() {
        assert!(Settings::default().validate().is_ok());
        let gif = Settings::default().with_output_format(OutputFormat::Gif);
        assert!(matches!(gif.validate(), Err(Error::Config(_))));
        assert!(Settings::default().with_fps(0).validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_recording_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "output_format = \"gif\"\n").unwrap();
        assert!(matches!(Settings::load(&path), Err(Error::Config(_))));
    }
}
