//! Out-of-process transcoding via the ffmpeg CLI

use super::ConversionProfile;
use crate::error::{Error, Result};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Lines of ffmpeg stderr kept in error messages
const STDERR_TAIL_LINES: usize = 5;

/// Converts a finished WebM file into a deliverable format
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` into `output`; a partial `output` may exist on failure
    async fn transcode(&self, input: &Path, output: &Path, profile: &ConversionProfile) -> Result<()>;
}

/// Transcoder running the ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Full argument list for one conversion
    pub fn command_args(input: &Path, output: &Path, profile: &ConversionProfile) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(profile.output_args().iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("; ")
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, profile: &ConversionProfile) -> Result<()> {
        tracing::info!(
            "Converting {} -> {} ({} {})",
            input.display(),
            output.display(),
            profile.format,
            profile.tier
        );

        let result = Command::new(&self.binary)
            .args(Self::command_args(input, output, profile))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Encode(format!("Failed to start {}: {}", self.binary.display(), e)))?;

        if !result.status.success() {
            return Err(Error::Encode(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr_tail(&result.stderr)
            )));
        }

        if !output.exists() {
            return Err(Error::Encode(format!(
                "ffmpeg produced no output at {}",
                output.display()
            )));
        }

        Ok(())
    }
}

/// What the local ffmpeg binary can do
#[derive(Debug, Clone, Default)]
pub struct FfmpegInfo {
    /// First line of `ffmpeg -version`
    pub version: Option<String>,
    pub libx264: bool,
    pub libvpx: bool,
    pub libopus: bool,
    pub libmp3lame: bool,
}

impl FfmpegInfo {
    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }
}

/// Probe an ffmpeg binary for its version and the encoders in use
pub async fn probe_ffmpeg(binary: &Path) -> FfmpegInfo {
    let version = match Command::new(binary).arg("-version").output().await {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
            .lines()
            .next()
            .map(|l| l.trim().to_string()),
        Ok(_) | Err(_) => None,
    };
    if version.is_none() {
        return FfmpegInfo::default();
    }

    let encoders = Command::new(binary)
        .args(["-hide_banner", "-encoders"])
        .output()
        .await
        .map(|out| String::from_utf8_lossy(&out.stdout).into_owned())
        .unwrap_or_default();

    FfmpegInfo {
        version,
        libx264: encoders.contains("libx264"),
        libvpx: encoders.contains("libvpx"),
        libopus: encoders.contains("libopus"),
        libmp3lame: encoders.contains("libmp3lame"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputFormat, QualityTier};

    #[test]
    fn test_command_args_order() {
        let profile = ConversionProfile::for_target(OutputFormat::Gif, QualityTier::High).unwrap();
        let args = FfmpegTranscoder::command_args(
            Path::new("/tmp/temp-x.webm"),
            Path::new("/tmp/gif-x.gif"),
            &profile,
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(&args[..5], &["-hide_banner", "-nostdin", "-y", "-i", "/tmp/temp-x.webm"]);
        assert_eq!(args.last().unwrap(), "/tmp/gif-x.gif");
        assert!(args.contains(&"-loop".to_string()));
    }

    #[test]
    fn test_stderr_tail() {
        let stderr = b"line1\n\nline2\nline3\nline4\nline5\nline6\n";
        assert_eq!(stderr_tail(stderr), "line2; line3; line4; line5; line6");
    }

    #[tokio::test]
    async fn test_missing_binary_is_encode_error() {
        let transcoder = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary");
        let profile = ConversionProfile::for_target(OutputFormat::Mp3, QualityTier::High).unwrap();
        let err = transcoder
            .transcode(Path::new("in.webm"), Path::new("out.mp3"), &profile)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Encode(_)));

        let info = probe_ffmpeg(Path::new("/nonexistent/ffmpeg-binary")).await;
        assert!(!info.is_available());
    }
}
