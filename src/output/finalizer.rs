//! Intermediate file lifecycle and conversion

use super::naming::FileStamp;
use crate::config::{CaptureKind, OutputFormat, QualityTier};
use crate::encode::{ConversionProfile, Transcoder};
use crate::error::{Error, Result};
use crate::notify::{Collaborator, ConversionStatus};
use crate::recorder::ChunkSequence;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Paths involved in finalizing one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingArtifact {
    /// `temp-<stamp>.webm`
    pub temp_path: PathBuf,
    /// `<kind>-<stamp>.<ext>`
    pub final_path: PathBuf,
    /// `<kind>-<stamp>.webm`, kept when conversion fails
    pub fallback_path: PathBuf,
    pub format: OutputFormat,
    pub kind: CaptureKind,
}

/// How the artifact ended up on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeStatus {
    /// Transcoded into the requested format
    Converted,
    /// Written as-is
    Passthrough,
    /// Conversion failed; the intermediate was kept instead
    Degraded { reason: String },
}

/// Result of finalizing a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub path: PathBuf,
    pub kind: CaptureKind,
    /// Format of the file at `path`
    pub format: OutputFormat,
    pub status: FinalizeStatus,
    pub bytes: u64,
}

impl FinalizeOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, FinalizeStatus::Degraded { .. })
    }
}

fn fs_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Filesystem(format!("Failed to {} {}: {}", action, path.display(), e))
}

/// Writes intermediates, converts them and reports the outcome
pub struct OutputFinalizer {
    save_dir: PathBuf,
    transcoder: Arc<dyn Transcoder>,
    collaborator: Arc<dyn Collaborator>,
}

impl OutputFinalizer {
    pub fn new(
        save_dir: impl Into<PathBuf>,
        transcoder: Arc<dyn Transcoder>,
        collaborator: Arc<dyn Collaborator>,
    ) -> Self {
        Self {
            save_dir: save_dir.into(),
            transcoder,
            collaborator,
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Paths for a capture taken at `stamp`
    pub fn artifact(&self, kind: CaptureKind, format: OutputFormat, stamp: &FileStamp) -> RecordingArtifact {
        RecordingArtifact {
            temp_path: self.save_dir.join(stamp.temp_file_name()),
            final_path: self.save_dir.join(stamp.file_name(kind, format.extension())),
            fallback_path: self
                .save_dir
                .join(stamp.file_name(kind, super::naming::INTERMEDIATE_EXTENSION)),
            format,
            kind,
        }
    }

    /// Write recorded chunks and convert them into `format`
    pub async fn finalize(
        &self,
        chunks: ChunkSequence,
        kind: CaptureKind,
        format: OutputFormat,
        tier: QualityTier,
    ) -> Result<FinalizeOutcome> {
        self.finalize_stamped(chunks, kind, format, tier, &FileStamp::now())
            .await
    }

    pub(crate) async fn finalize_stamped(
        &self,
        chunks: ChunkSequence,
        kind: CaptureKind,
        format: OutputFormat,
        tier: QualityTier,
        stamp: &FileStamp,
    ) -> Result<FinalizeOutcome> {
        if chunks.is_empty() {
            return Err(Error::EmptyRecording);
        }
        self.ensure_dir().await?;

        let artifact = self.artifact(kind, format, stamp);
        let written = write_chunks(&artifact.temp_path, &chunks).await?;
        tracing::info!(
            "Wrote {} ({} chunks, {} bytes)",
            artifact.temp_path.display(),
            chunks.len(),
            written
        );
        drop(chunks);

        self.convert(&artifact, tier).await
    }

    /// Convert an existing intermediate file; the input is left untouched
    pub async fn finalize_file(
        &self,
        input: &Path,
        kind: CaptureKind,
        format: OutputFormat,
        tier: QualityTier,
    ) -> Result<FinalizeOutcome> {
        self.ensure_dir().await?;
        let artifact = self.artifact(kind, format, &FileStamp::now());
        tokio::fs::copy(input, &artifact.temp_path)
            .await
            .map_err(|e| fs_error("copy", input, e))?;
        self.convert(&artifact, tier).await
    }

    /// Save raw PNG bytes from a screenshot or snip
    pub async fn save_image(&self, bytes: &[u8], kind: CaptureKind) -> Result<FinalizeOutcome> {
        if bytes.is_empty() {
            return Err(Error::EmptyRecording);
        }
        self.ensure_dir().await?;
        let stamp = FileStamp::now();
        let path = self
            .save_dir
            .join(stamp.file_name(kind, OutputFormat::Png.extension()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| fs_error("write", &path, e))?;
        tracing::info!("Saved {}", path.display());

        let outcome = FinalizeOutcome {
            path,
            kind,
            format: OutputFormat::Png,
            status: FinalizeStatus::Passthrough,
            bytes: bytes.len() as u64,
        };
        self.collaborator.capture_saved(&outcome);
        Ok(outcome)
    }

    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.save_dir)
            .await
            .map_err(|e| fs_error("create", &self.save_dir, e))
    }

    async fn convert(&self, artifact: &RecordingArtifact, tier: QualityTier) -> Result<FinalizeOutcome> {
        let Some(profile) = ConversionProfile::for_target(artifact.format, tier) else {
            tokio::fs::rename(&artifact.temp_path, &artifact.final_path)
                .await
                .map_err(|e| fs_error("rename", &artifact.temp_path, e))?;
            return outcome(&artifact.final_path, artifact, artifact.format, FinalizeStatus::Passthrough)
                .await;
        };

        self.collaborator.conversion_status(ConversionStatus::Converting);

        match self
            .transcoder
            .transcode(&artifact.temp_path, &artifact.final_path, &profile)
            .await
        {
            Ok(()) => {
                if let Err(e) = tokio::fs::remove_file(&artifact.temp_path).await {
                    tracing::warn!("Failed to delete {}: {}", artifact.temp_path.display(), e);
                }
                self.collaborator.conversion_status(ConversionStatus::Done);
                tracing::info!("Saved {}", artifact.final_path.display());
                outcome(&artifact.final_path, artifact, artifact.format, FinalizeStatus::Converted).await
            }
            Err(e) => {
                tracing::warn!(
                    "Conversion to {} failed, keeping {}: {}",
                    artifact.format,
                    artifact.fallback_path.display(),
                    e
                );
                // drop any partial output
                let _ = tokio::fs::remove_file(&artifact.final_path).await;
                tokio::fs::rename(&artifact.temp_path, &artifact.fallback_path)
                    .await
                    .map_err(|e| fs_error("rename", &artifact.temp_path, e))?;
                self.collaborator.conversion_status(ConversionStatus::Failed);
                outcome(
                    &artifact.fallback_path,
                    artifact,
                    OutputFormat::Webm,
                    FinalizeStatus::Degraded {
                        reason: e.to_string(),
                    },
                )
                .await
            }
        }
    }
}

async fn write_chunks(path: &Path, chunks: &ChunkSequence) -> Result<u64> {
    let write = async {
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        for chunk in chunks.iter() {
            file.write_all(chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok::<u64, std::io::Error>(written)
    };

    match write.await {
        Ok(written) => Ok(written),
        Err(e) => {
            let _ = tokio::fs::remove_file(path).await;
            Err(fs_error("write", path, e))
        }
    }
}

async fn outcome(
    path: &Path,
    artifact: &RecordingArtifact,
    format: OutputFormat,
    status: FinalizeStatus,
) -> Result<FinalizeOutcome> {
    let bytes = tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .map_err(|e| fs_error("stat", path, e))?;
    Ok(FinalizeOutcome {
        path: path.to_path_buf(),
        kind: artifact.kind,
        format,
        status,
        bytes,
    })
}
