//! SnapRec CLI
//!
//! Command-line interface for trying out the recording core.

use clap::{Parser, Subcommand, ValueEnum};
use snaprec::{
    capture::{SourceId, StreamAcquisition, TestPatternAcquisition},
    config::{CaptureKind, OutputFormat, QualityTier, Settings},
    encode::{probe_ffmpeg, ConversionProfile, FfmpegTranscoder, FfmpegWebmFactory},
    notify::{ChannelCollaborator, StatusEvent},
    output::OutputFinalizer,
    Recorder, StartRequest,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// What to record
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Kind {
    /// Screen recording with audio
    #[default]
    Video,
    /// Silent animated GIF
    Gif,
    /// Microphone only, saved as MP3
    Audio,
}

impl From<Kind> for CaptureKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Video => CaptureKind::Recording,
            Kind::Gif => CaptureKind::Gif,
            Kind::Audio => CaptureKind::Audio,
        }
    }
}

/// Final format for screen recordings
#[derive(Debug, Clone, Copy, ValueEnum)]
enum VideoFormat {
    Mp4,
    Webm,
}

impl From<VideoFormat> for OutputFormat {
    fn from(f: VideoFormat) -> Self {
        match f {
            VideoFormat::Mp4 => OutputFormat::Mp4,
            VideoFormat::Webm => OutputFormat::Webm,
        }
    }
}

/// Target of a conversion
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Mp4,
    Webm,
    Gif,
    Mp3,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Mp4 => OutputFormat::Mp4,
            Format::Webm => OutputFormat::Webm,
            Format::Gif => OutputFormat::Gif,
            Format::Mp3 => OutputFormat::Mp3,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Quality {
    High,
    Medium,
    Low,
}

impl From<Quality> for QualityTier {
    fn from(q: Quality) -> Self {
        match q {
            Quality::High => QualityTier::High,
            Quality::Medium => QualityTier::Medium,
            Quality::Low => QualityTier::Low,
        }
    }
}

#[derive(Parser)]
#[command(name = "snaprec")]
#[command(about = "Screen recording core - Composite, Record, Transcode")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to <config dir>/snaprec/settings.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show ffmpeg availability and current settings
    Info,

    /// List conversion profiles
    Profiles,

    /// Record from the synthetic test-pattern source
    Record {
        /// What to record
        #[arg(short, long, value_enum, default_value = "video")]
        kind: Kind,

        /// Display source (screen:N or window:N)
        #[arg(short, long, default_value = "screen:0")]
        source: String,

        /// Stop after this many seconds (default: wait for Ctrl+C)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Final format for video recordings
        #[arg(short, long, value_enum)]
        format: Option<VideoFormat>,

        /// Quality tier
        #[arg(short, long, value_enum)]
        quality: Option<Quality>,

        /// Countdown before recording, in seconds
        #[arg(long)]
        countdown: Option<u32>,

        /// Directory receiving the recording
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a recorded WebM file
    Convert {
        /// Intermediate WebM file
        input: PathBuf,

        /// Target format
        #[arg(short, long, value_enum, default_value = "mp4")]
        format: Format,

        /// Quality tier
        #[arg(short, long, value_enum, default_value = "high")]
        quality: Quality,

        /// Directory receiving the result (default: save path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("snaprec=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().or_else(default_config_path);
    let settings = match &config_path {
        Some(path) => Settings::load_or_default(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Info => cmd_info(&settings, config_path).await,
        Commands::Profiles => cmd_profiles(),
        Commands::Record {
            kind,
            source,
            duration,
            format,
            quality,
            countdown,
            output,
        } => {
            let mut settings = settings;
            if let Some(format) = format {
                settings = settings.with_output_format(format.into());
            }
            if let Some(quality) = quality {
                settings = settings.with_quality(quality.into());
            }
            if let Some(secs) = countdown {
                settings = settings.with_countdown(secs);
            }
            if let Some(dir) = output {
                settings = settings.with_save_path(dir);
            }
            settings.validate()?;
            cmd_record(settings, kind, source, duration).await
        }
        Commands::Convert {
            input,
            format,
            quality,
            output,
        } => {
            let mut settings = settings;
            if let Some(dir) = output {
                settings = settings.with_save_path(dir);
            }
            cmd_convert(settings, input, format.into(), quality.into()).await
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("snaprec").join("settings.toml"))
}

async fn cmd_info(settings: &Settings, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    println!("SnapRec {}", snaprec::VERSION);
    println!("============\n");

    let info = probe_ffmpeg(&settings.ffmpeg_path).await;
    println!("=== ffmpeg ({}) ===", settings.ffmpeg_path.display());
    match &info.version {
        Some(version) => println!("Version: {}", version),
        None => println!("Available: No"),
    }
    if info.is_available() {
        let yes_no = |b: bool| if b { "Yes" } else { "No" };
        println!("  - H.264 (libx264): {}", yes_no(info.libx264));
        println!("  - VP8/VP9 (libvpx): {}", yes_no(info.libvpx));
        println!("  - Opus (libopus): {}", yes_no(info.libopus));
        println!("  - MP3 (libmp3lame): {}", yes_no(info.libmp3lame));
    }

    println!("\n=== Settings ===");
    if let Some(path) = config_path {
        println!("File: {}", path.display());
    }
    println!("Save path: {}", settings.save_path.display());
    println!("Quality: {}", settings.video_quality);
    println!("FPS: {}", settings.fps);
    println!("Format: {}", settings.output_format);
    println!(
        "Audio: desktop={} mic={}",
        settings.record_audio, settings.record_mic
    );

    println!("\n=== Sources (test pattern) ===");
    for source in TestPatternAcquisition::new().list_sources().await? {
        match source.resolution {
            Some(res) => println!("  {:<10} {} ({})", source.id.to_string(), source.name, res),
            None => println!("  {:<10} {}", source.id.to_string(), source.name),
        }
    }

    Ok(())
}

fn cmd_profiles() -> anyhow::Result<()> {
    println!("Conversion Profiles");
    println!("===================\n");

    for format in [OutputFormat::Mp4, OutputFormat::Gif, OutputFormat::Mp3] {
        for tier in QualityTier::ALL {
            if let Some(profile) = ConversionProfile::for_target(format, tier) {
                println!(
                    "  {:<5} {:<7} {}",
                    format,
                    tier,
                    profile.output_args().join(" ")
                );
            }
        }
    }
    println!("  webm  (any)   written as recorded");

    Ok(())
}

async fn cmd_record(
    settings: Settings,
    kind: Kind,
    source: String,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let kind: CaptureKind = kind.into();
    let request = if kind.has_video() {
        StartRequest {
            kind,
            source: Some(source.parse::<SourceId>()?),
        }
    } else {
        StartRequest::audio()
    };

    println!("Configuration:");
    println!("  Kind: {}", kind.prefix());
    println!("  Quality: {}", settings.video_quality);
    println!("  FPS: {}", settings.fps);
    println!("  Format: {}", kind.target_format(settings.output_format));
    println!("  Save path: {}", settings.save_path.display());
    println!();

    let collaborator = Arc::new(ChannelCollaborator::default());
    let mut events = collaborator.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                StatusEvent::Countdown(n) => println!("  {}...", n),
                StatusEvent::Elapsed(t) if t.paused => println!("  {} (paused)", t.time),
                StatusEvent::Elapsed(t) => println!("  {}", t.time),
                StatusEvent::Conversion(status) => println!("  {}", status),
                _ => {}
            }
        }
    });

    let recorder = Recorder::new(
        settings.clone(),
        Arc::new(TestPatternAcquisition::new()),
        Arc::new(FfmpegWebmFactory::new(&settings.ffmpeg_path)),
        Arc::new(FfmpegTranscoder::new(&settings.ffmpeg_path)),
    )
    .with_collaborator(collaborator)
    .spawn();

    recorder.start(request).await?;
    match duration {
        Some(secs) => {
            println!("Recording for {}s. Press Ctrl+C to stop early.\n", secs);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                result = tokio::signal::ctrl_c() => result?,
            }
        }
        None => {
            println!("Recording. Press Ctrl+C to stop.\n");
            tokio::signal::ctrl_c().await?;
        }
    }

    println!("\nStopping...");
    let outcome = recorder.stop().await?;
    recorder.shutdown().await?;
    printer.abort();

    println!("\nSaved: {}", outcome.path.display());
    println!("  Format: {}", outcome.format);
    println!("  Size: {} bytes", outcome.bytes);
    if outcome.is_degraded() {
        println!("  Conversion failed; kept the WebM recording instead");
    }

    Ok(())
}

async fn cmd_convert(
    settings: Settings,
    input: PathBuf,
    format: OutputFormat,
    tier: QualityTier,
) -> anyhow::Result<()> {
    let kind = match format {
        OutputFormat::Gif => CaptureKind::Gif,
        OutputFormat::Mp3 => CaptureKind::Audio,
        _ => CaptureKind::Recording,
    };

    let finalizer = OutputFinalizer::new(
        settings.save_path.clone(),
        Arc::new(FfmpegTranscoder::new(&settings.ffmpeg_path)),
        Arc::new(snaprec::notify::NoopCollaborator),
    );
    println!("Converting {} to {}...", input.display(), format);
    let outcome = finalizer.finalize_file(&input, kind, format, tier).await?;

    println!("Saved: {}", outcome.path.display());
    if outcome.is_degraded() {
        println!("Conversion failed; kept a WebM copy instead");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_format_limited_to_video() {
        assert!(Cli::try_parse_from(["snaprec", "record", "--format", "webm"]).is_ok());
        assert!(Cli::try_parse_from(["snaprec", "record", "--format", "gif"]).is_err());
        assert!(Cli::try_parse_from(["snaprec", "record", "--format", "mp3"]).is_err());
        assert!(Cli::try_parse_from(["snaprec", "convert", "in.webm", "--format", "gif"]).is_ok());
    }

    #[test]
    fn test_profile_flag_removed() {
        assert!(Cli::try_parse_from(["snaprec", "record", "--profile", "gaming"]).is_err());
    }
}
