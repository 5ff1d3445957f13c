//! Slideshow composition policy: when a gallery fetch yields images plus
//! an audio track, render them into a single video.

use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use super::traits::Transcoder;
use crate::media::{MediaFile, MediaKind};
use crate::metrics;

/// Decides whether a fetched file set should become a slideshow and runs
/// the composition. Best-effort: any failure leaves the original files
/// untouched for delivery as-is.
pub struct SlideshowComposer {
    transcoder: Arc<dyn Transcoder>,
    temp_dir: PathBuf,
}

impl SlideshowComposer {
    pub fn new(transcoder: Arc<dyn Transcoder>, temp_dir: PathBuf) -> Self {
        Self {
            transcoder,
            temp_dir,
        }
    }

    /// Whether a file set should become a slideshow: at least one image,
    /// exactly one audio track, no videos.
    pub fn is_candidate(files: &[MediaFile]) -> bool {
        let images = files.iter().filter(|f| f.kind == MediaKind::Image).count();
        let audio = files.iter().filter(|f| f.kind == MediaKind::Audio).count();
        let has_video = files.iter().any(|f| f.kind == MediaKind::Video);
        images >= 1 && audio == 1 && !has_video
    }

    /// Composes images and audio into one video when
    /// [`is_candidate`](Self::is_candidate) holds.
    ///
    /// Returns the composed video, or `None` when the preconditions do not
    /// hold or composition fails.
    pub async fn compose(&self, files: &[MediaFile]) -> Option<MediaFile> {
        if !Self::is_candidate(files) {
            tracing::debug!("file set is not a slideshow candidate");
            return None;
        }

        let images: Vec<&MediaFile> = files.iter().filter(|f| f.kind == MediaKind::Image).collect();
        let audio: Vec<&MediaFile> = files.iter().filter(|f| f.kind == MediaKind::Audio).collect();

        let output = self.temp_dir.join(format!(
            "slideshow_{}.mp4",
            &Uuid::new_v4().simple().to_string()[..8]
        ));

        let image_paths: Vec<&std::path::Path> =
            images.iter().map(|f| f.path.as_path()).collect();

        match self
            .transcoder
            .compose_slideshow(&image_paths, &audio[0].path, &output)
            .await
        {
            Ok(()) => {
                metrics::SLIDESHOWS_COMPOSED.inc();
                tracing::info!(output = %output.display(), images = images.len(), "slideshow composed");
                Some(MediaFile::new(output))
            }
            Err(e) => {
                tracing::warn!(error = %e, "slideshow composition failed, delivering files as-is");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTranscoder;

    fn files(names: &[&str]) -> Vec<MediaFile> {
        names
            .iter()
            .map(|n| MediaFile::new(format!("/tmp/{n}")))
            .collect()
    }

    #[tokio::test]
    async fn test_composes_images_plus_audio() {
        let transcoder = Arc::new(MockTranscoder::new());
        let composer = SlideshowComposer::new(transcoder.clone(), PathBuf::from("/tmp"));

        let out = composer
            .compose(&files(&["1.jpg", "2.jpg", "3.jpg", "sound.mp3"]))
            .await;

        let out = out.unwrap();
        assert_eq!(out.kind, MediaKind::Video);
        assert!(out.file_name().starts_with("slideshow_"));
        assert_eq!(transcoder.compose_calls().await, 1);
    }

    #[tokio::test]
    async fn test_skips_without_audio() {
        let transcoder = Arc::new(MockTranscoder::new());
        let composer = SlideshowComposer::new(transcoder.clone(), PathBuf::from("/tmp"));

        assert!(composer.compose(&files(&["1.jpg", "2.jpg"])).await.is_none());
        assert_eq!(transcoder.compose_calls().await, 0);
    }

    #[tokio::test]
    async fn test_skips_when_video_present() {
        let transcoder = Arc::new(MockTranscoder::new());
        let composer = SlideshowComposer::new(transcoder.clone(), PathBuf::from("/tmp"));

        let out = composer
            .compose(&files(&["1.jpg", "clip.mp4", "sound.mp3"]))
            .await;
        assert!(out.is_none());
        assert_eq!(transcoder.compose_calls().await, 0);
    }

    #[tokio::test]
    async fn test_failure_returns_none() {
        let transcoder = Arc::new(MockTranscoder::failing());
        let composer = SlideshowComposer::new(transcoder, PathBuf::from("/tmp"));

        let out = composer.compose(&files(&["1.jpg", "sound.mp3"])).await;
        assert!(out.is_none());
    }
}
