//! SnapRec - screen recording core
//!
//! Composites screen, webcam and zoom into one video stream, mixes desktop
//! and microphone audio, records it as chunked WebM and converts the result
//! into the requested format.
//!
//! # Features
//!
//! - **Capture**: pluggable stream acquisition (screens, windows, mic, webcam)
//! - **Compose**: zoom crop and picture-in-picture webcam at a fixed framerate
//! - **Record**: countdown, pause/resume, auto-stop and scheduled start
//! - **Output**: MP4, WebM, GIF and MP3 via ffmpeg, with a WebM fallback
//!
//! # Example
//!
//! ```rust,no_run
//! use snaprec::capture::{SourceId, TestPatternAcquisition};
//! use snaprec::encode::{FfmpegTranscoder, FfmpegWebmFactory};
//! use snaprec::{Recorder, Settings, StartRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> snaprec::Result<()> {
//!     let settings = Settings::default();
//!     let recorder = Recorder::new(
//!         settings.clone(),
//!         Arc::new(TestPatternAcquisition::new()),
//!         Arc::new(FfmpegWebmFactory::new(&settings.ffmpeg_path)),
//!         Arc::new(FfmpegTranscoder::new(&settings.ffmpeg_path)),
//!     )
//!     .spawn();
//!
//!     recorder.start(StartRequest::recording(SourceId::screen(0))).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     let saved = recorder.stop().await?;
//!     println!("Saved {}", saved.path.display());
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod capture;
pub mod config;
pub mod encode;
pub mod error;
pub mod notify;
pub mod output;
pub mod processing;
pub mod recorder;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::{CaptureKind, OutputFormat, QualityTier, Settings};
pub use error::{Error, Result};
pub use notify::{ChannelCollaborator, Collaborator, ConversionStatus, StatusEvent};
pub use output::{FinalizeOutcome, FinalizeStatus, OutputFinalizer};
pub use recorder::{Recorder, RecorderHandle, RecorderState, RecorderStatus, StartRequest};
pub use types::{Frame, Framerate, Resolution};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
