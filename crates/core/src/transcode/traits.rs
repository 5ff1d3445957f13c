//! Trait definitions for the transcode module.

use async_trait::async_trait;
use std::path::Path;

use super::error::TranscodeError;

/// A transcoder that can probe and rework media files.
///
/// All output-producing operations follow the same contract: on failure
/// any partial output file is deleted before the error is returned, and a
/// successful return guarantees the output exists and is non-trivial.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Returns the duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, TranscodeError>;

    /// Renders a sequence of images plus an audio track into a video
    /// whose length matches the audio.
    async fn compose_slideshow(
        &self,
        images: &[&Path],
        audio: &Path,
        output: &Path,
    ) -> Result<(), TranscodeError>;

    /// Re-encodes a video into an upload-friendly H.264 baseline profile.
    async fn optimize_video(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;

    /// Remuxes a video so the moov atom leads, without re-encoding.
    async fn remux_faststart(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;

    /// Validates that ffmpeg and ffprobe are present and runnable.
    async fn validate(&self) -> Result<(), TranscodeError>;
}
