//! Pairing of the primary video downloader with the gallery fallback.

use std::sync::Arc;

use super::traits::{GalleryDownloader, VideoDownloader};
use super::types::{FetchError, FetchOutcome, FetchResult};
use crate::metrics;

/// Owns both downloaders and runs the primary-then-fallback policy.
pub struct MediaFetcher {
    video: Arc<dyn VideoDownloader>,
    gallery: Arc<dyn GalleryDownloader>,
}

impl MediaFetcher {
    pub fn new(video: Arc<dyn VideoDownloader>, gallery: Arc<dyn GalleryDownloader>) -> Self {
        Self { video, gallery }
    }

    /// Tries the primary downloader first. On the ambiguous signal the
    /// gallery fallback runs exactly once; any other failure is terminal.
    ///
    /// `on_fallback` fires between the two attempts so the caller can
    /// switch its progress display.
    pub async fn fetch<F>(&self, url: &str, on_fallback: F) -> Result<FetchResult, FetchError>
    where
        F: FnOnce(),
    {
        metrics::FETCH_ATTEMPTS
            .with_label_values(&[self.video.name()])
            .inc();

        match self.video.download(url).await {
            FetchOutcome::Fetched(result) => Ok(result),
            FetchOutcome::Failed(e) => {
                metrics::FETCH_FAILURES
                    .with_label_values(&[self.video.name()])
                    .inc();
                Err(e)
            }
            FetchOutcome::Ambiguous { detail } => {
                tracing::info!(url, detail, "primary downloader ambiguous, trying gallery");
                on_fallback();

                metrics::FETCH_ATTEMPTS
                    .with_label_values(&[self.gallery.name()])
                    .inc();
                self.gallery.download(url).await.inspect_err(|_| {
                    metrics::FETCH_FAILURES
                        .with_label_values(&[self.gallery.name()])
                        .inc();
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockGalleryDownloader, MockVideoDownloader};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let video = Arc::new(MockVideoDownloader::fetched(vec!["/tmp/a.mp4"]));
        let gallery = Arc::new(MockGalleryDownloader::fetched(vec![]));
        let fetcher = MediaFetcher::new(video, gallery.clone());

        let result = fetcher.fetch("https://youtu.be/x", || {}).await.unwrap();
        assert_eq!(result.files.len(), 1);
        assert!(!result.from_gallery);
        assert_eq!(gallery.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_ambiguous_triggers_fallback_once() {
        let video = Arc::new(MockVideoDownloader::ambiguous());
        let gallery = Arc::new(MockGalleryDownloader::fetched(vec![
            "/tmp/1.jpg",
            "/tmp/2.jpg",
        ]));
        let fetcher = MediaFetcher::new(video.clone(), gallery.clone());

        let fallback_seen = AtomicBool::new(false);
        let result = fetcher
            .fetch("https://tiktok.com/@u/photo/1", || {
                fallback_seen.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert!(result.from_gallery);
        assert!(fallback_seen.load(Ordering::SeqCst));
        assert_eq!(video.call_count().await, 1);
        assert_eq!(gallery.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_terminal_failure_skips_fallback() {
        let video = Arc::new(MockVideoDownloader::failed(FetchError::Private));
        let gallery = Arc::new(MockGalleryDownloader::fetched(vec!["/tmp/1.jpg"]));
        let fetcher = MediaFetcher::new(video, gallery.clone());

        let err = fetcher
            .fetch("https://instagram.com/p/x", || {})
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Private));
        assert_eq!(gallery.call_count().await, 0);
    }
}
