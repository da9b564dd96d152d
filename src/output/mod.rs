//! Output module
//!
//! Provides:
//! - artifact naming (`<kind>-<stamp>.<ext>`, `temp-<stamp>.webm`)
//! - the finalizer: intermediate write, conversion, fallback on failure

mod finalizer;
mod naming;

pub use finalizer::{FinalizeOutcome, FinalizeStatus, OutputFinalizer, RecordingArtifact};
pub use naming::{FileStamp, INTERMEDIATE_EXTENSION, TEMP_PREFIX};
