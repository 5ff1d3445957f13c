//! Upload optimization policy: re-encode the video into a baseline
//! profile so the platform streams it natively.

use std::path::PathBuf;
use std::sync::Arc;

use super::traits::Transcoder;
use crate::media::MediaFile;
use crate::metrics;

/// Re-encodes a fetched video for upload. Best-effort: when the re-encode
/// fails a container-only faststart remux is attempted, and when that
/// fails too the original file is delivered instead.
pub struct DeliveryOptimizer {
    transcoder: Arc<dyn Transcoder>,
}

impl DeliveryOptimizer {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self { transcoder }
    }

    /// Optimizes a video, writing next to the input with an `_optimized`
    /// suffix (probing with a counter when the name is taken).
    ///
    /// Returns the optimized (or remuxed) file, or `None` when both
    /// attempts fail.
    pub async fn optimize(&self, video: &MediaFile) -> Option<MediaFile> {
        let output = suffixed_output_path(&video.path, "optimized");

        match self.transcoder.optimize_video(&video.path, &output).await {
            Ok(()) => {
                metrics::VIDEOS_OPTIMIZED.inc();
                tracing::info!(
                    input = %video.file_name(),
                    output = %output.display(),
                    "video optimized for upload"
                );
                Some(MediaFile::new(output))
            }
            Err(e) => {
                tracing::warn!(error = %e, input = %video.file_name(), "optimization failed, trying faststart remux");
                self.remux(video).await
            }
        }
    }

    async fn remux(&self, video: &MediaFile) -> Option<MediaFile> {
        let output = suffixed_output_path(&video.path, "faststart");

        match self.transcoder.remux_faststart(&video.path, &output).await {
            Ok(()) => {
                tracing::info!(
                    input = %video.file_name(),
                    output = %output.display(),
                    "video remuxed for streaming"
                );
                Some(MediaFile::new(output))
            }
            Err(e) => {
                tracing::warn!(error = %e, input = %video.file_name(), "remux failed, delivering original");
                None
            }
        }
    }
}

/// `<stem>_<suffix>.mp4` beside the input, `_<suffix>_N` on collision.
fn suffixed_output_path(input: &std::path::Path, suffix: &str) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| std::path::Path::new("."));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut output = dir.join(format!("{stem}_{suffix}.mp4"));
    let mut count = 1;
    while output.exists() {
        output = dir.join(format!("{stem}_{suffix}_{count}.mp4"));
        count += 1;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTranscoder;

    #[tokio::test]
    async fn test_optimize_names_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        tokio::fs::write(&input, b"x").await.unwrap();

        let optimizer = DeliveryOptimizer::new(Arc::new(MockTranscoder::new()));
        let out = optimizer.optimize(&MediaFile::new(input)).await.unwrap();
        assert_eq!(out.file_name(), "clip_optimized.mp4");
    }

    #[tokio::test]
    async fn test_optimize_failure_returns_none() {
        let transcoder = Arc::new(MockTranscoder::failing());
        let optimizer = DeliveryOptimizer::new(transcoder.clone());
        assert!(optimizer
            .optimize(&MediaFile::new("/tmp/clip.mp4"))
            .await
            .is_none());
        // The cheap remux was still attempted before giving up.
        assert_eq!(transcoder.remux_calls().await, 1);
    }

    #[tokio::test]
    async fn test_remux_fallback_when_reencode_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        tokio::fs::write(&input, b"x").await.unwrap();

        let optimizer = DeliveryOptimizer::new(Arc::new(MockTranscoder::failing_optimize()));
        let out = optimizer.optimize(&MediaFile::new(input)).await.unwrap();
        assert_eq!(out.file_name(), "clip_faststart.mp4");
    }

    #[tokio::test]
    async fn test_output_collision_probing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        tokio::fs::write(&input, b"x").await.unwrap();
        tokio::fs::write(dir.path().join("clip_optimized.mp4"), b"x")
            .await
            .unwrap();

        let out = suffixed_output_path(&input, "optimized");
        assert_eq!(
            out.file_name().unwrap().to_str().unwrap(),
            "clip_optimized_1.mp4"
        );
    }
}
