//! Error types for the transcode module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during probing or transcoding.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Transcode process failed or produced an invalid output.
    #[error("Transcode failed: {reason}")]
    TranscodeFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Transcode timed out.
    #[error("Transcode timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// I/O error during transcoding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },
}

impl TranscodeError {
    /// Creates a new transcode failed error with stderr output.
    pub fn transcode_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::TranscodeFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

}
