//! Error types for SnapRec

use thiserror::Error;

/// Result type alias for SnapRec operations
pub type Result<T> = std::result::Result<T, Error>;

/// SnapRec error type
#[derive(Error, Debug)]
pub enum Error {
    // Acquisition errors
    #[error("Capture source unavailable: {0}")]
    Acquisition(String),

    #[error("Invalid source id: {0}")]
    InvalidSource(String),

    // Compositing errors
    #[error("Frame skipped: {0}")]
    CompositingFrame(String),

    #[error("Scaling error: {0}")]
    Scaling(String),

    // Audio errors
    #[error("Audio source degraded: {0}")]
    MixingDegradation(String),

    #[error("Audio track ended")]
    TrackEnded,

    // Encoder errors
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Encoder not started")]
    EncoderNotStarted,

    #[error("Recording produced no data")]
    EmptyRecording,

    // Output errors
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    // Recorder errors
    #[error("Invalid recorder state: cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("A capture session is already active")]
    SessionActive,

    #[error("Recording aborted")]
    Aborted,

    #[error("Recorder is shut down")]
    RecorderClosed,

    // General errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors local to one frame or one audio source; logged and absorbed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CompositingFrame(_)
                | Error::Scaling(_)
                | Error::MixingDegradation(_)
                | Error::TrackEnded
        )
    }

    /// Errors that must be reported to the user with a readable status
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Error::Acquisition(_)
                | Error::InvalidSource(_)
                | Error::Filesystem(_)
                | Error::Io(_)
                | Error::SessionActive
                | Error::Config(_)
        )
    }
}
