//! ffmpeg output arguments per deliverable format

use crate::config::{OutputFormat, QualityTier};
use crate::types::Resolution;

/// GIF output framerate and width
const GIF_FPS: u32 = 15;
const GIF_WIDTH: u32 = 720;

/// Output parameters for converting a WebM recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionProfile {
    pub format: OutputFormat,
    pub tier: QualityTier,
    args: Vec<String>,
}

impl ConversionProfile {
    /// Profile for a format, or `None` when the recording is kept as-is
    pub fn for_target(format: OutputFormat, tier: QualityTier) -> Option<Self> {
        let args = match format {
            OutputFormat::Webm | OutputFormat::Png => return None,
            OutputFormat::Mp4 => mp4_args(tier),
            OutputFormat::Gif => gif_args(),
            OutputFormat::Mp3 => mp3_args(),
        };
        Some(Self { format, tier, args })
    }

    /// Arguments placed between the input and the output path
    pub fn output_args(&self) -> &[String] {
        &self.args
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

fn kbps(bits: u32) -> String {
    format!("{}k", bits / 1000)
}

/// Scale filter shrinking to the tier ceiling, never enlarging
fn ceiling_filter(ceiling: Resolution) -> String {
    format!(
        "scale='min({w},iw)':'min({h},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2",
        w = ceiling.width,
        h = ceiling.height
    )
}

fn mp4_args(tier: QualityTier) -> Vec<String> {
    let bitrate = tier.video_bitrate();
    let args = [
        "-r".to_string(),
        "30".to_string(),
        "-vf".to_string(),
        ceiling_filter(tier.resolution_ceiling()),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-profile:v".to_string(),
        "high".to_string(),
        "-level".to_string(),
        "4.1".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        tier.x264_preset().to_string(),
        "-crf".to_string(),
        tier.crf().to_string(),
        "-b:v".to_string(),
        kbps(bitrate),
        "-maxrate".to_string(),
        kbps(bitrate / 2 * 3),
        "-bufsize".to_string(),
        kbps(bitrate * 2),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-ar".to_string(),
        "48000".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ];
    args.to_vec()
}

fn gif_args() -> Vec<String> {
    vec![
        "-vf".into(),
        format!("fps={},scale={}:-1:flags=lanczos", GIF_FPS, GIF_WIDTH),
        "-loop".into(),
        "0".into(),
    ]
}

fn mp3_args() -> Vec<String> {
    ["-vn", "-c:a", "libmp3lame", "-b:a", "192k", "-ar", "44100"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
