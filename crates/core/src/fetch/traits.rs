//! Trait definitions for the fetch module.

use async_trait::async_trait;

use super::types::{FetchError, FetchOutcome, FetchResult};

/// Primary downloader for video posts.
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    /// Returns the name of this downloader implementation.
    fn name(&self) -> &str;

    /// Attempts to download the media behind a URL.
    ///
    /// Never returns `Err` for content-level problems: those are folded
    /// into [`FetchOutcome::Failed`] so the caller can distinguish the
    /// gallery-fallback signal ([`FetchOutcome::Ambiguous`]) from terminal
    /// failures.
    async fn download(&self, url: &str) -> FetchOutcome;

    /// Validates that the downloader binary is present and runnable.
    async fn validate(&self) -> Result<(), FetchError>;
}

/// Fallback downloader for image galleries and slideshow posts.
#[async_trait]
pub trait GalleryDownloader: Send + Sync {
    /// Returns the name of this downloader implementation.
    fn name(&self) -> &str;

    /// Downloads a gallery. Unlike the video path there is no further
    /// fallback, so any failure is terminal.
    async fn download(&self, url: &str) -> Result<FetchResult, FetchError>;

    /// Validates that the downloader binary is present and runnable.
    async fn validate(&self) -> Result<(), FetchError>;
}
