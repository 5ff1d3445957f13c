//! Mock downloaders for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetch::{
    FetchError, FetchOutcome, FetchResult, GalleryDownloader, VideoDownloader,
};
use crate::media::MediaFile;

enum VideoBehavior {
    Fetched(Vec<PathBuf>),
    Ambiguous,
    Failed,
}

/// Mock implementation of the [`VideoDownloader`] trait.
///
/// Configured at construction with one fixed outcome, and records every
/// URL it is asked to download for assertions.
pub struct MockVideoDownloader {
    behavior: VideoBehavior,
    /// Error returned by the first call when behavior is `Failed`.
    error: Arc<RwLock<Option<FetchError>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockVideoDownloader {
    /// Every download succeeds with the given file paths.
    pub fn fetched(paths: Vec<&str>) -> Self {
        Self {
            behavior: VideoBehavior::Fetched(paths.into_iter().map(PathBuf::from).collect()),
            error: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Every download reports the gallery-fallback signal.
    pub fn ambiguous() -> Self {
        Self {
            behavior: VideoBehavior::Ambiguous,
            error: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// The first download fails with the given error.
    pub fn failed(error: FetchError) -> Self {
        Self {
            behavior: VideoBehavior::Failed,
            error: Arc::new(RwLock::new(Some(error))),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// URLs this mock was asked to download.
    pub async fn recorded_urls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl VideoDownloader for MockVideoDownloader {
    fn name(&self) -> &str {
        "mock-video"
    }

    async fn download(&self, url: &str) -> FetchOutcome {
        self.calls.write().await.push(url.to_string());
        // Give concurrent tasks (the loading indicator) a chance to run,
        // as a real network download would.
        tokio::task::yield_now().await;
        match &self.behavior {
            VideoBehavior::Fetched(paths) => FetchOutcome::Fetched(FetchResult {
                files: paths.iter().map(MediaFile::new).collect(),
                from_gallery: false,
            }),
            VideoBehavior::Ambiguous => FetchOutcome::Ambiguous {
                detail: "mock ambiguous".to_string(),
            },
            VideoBehavior::Failed => {
                let error = self
                    .error
                    .write()
                    .await
                    .take()
                    .unwrap_or_else(|| FetchError::unexpected("mock error consumed"));
                FetchOutcome::Failed(error)
            }
        }
    }

    async fn validate(&self) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Mock implementation of the [`GalleryDownloader`] trait.
pub struct MockGalleryDownloader {
    files: Vec<PathBuf>,
    /// Error returned by the first call, when set.
    error: Arc<RwLock<Option<FetchError>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockGalleryDownloader {
    /// Every download succeeds with the given file paths.
    pub fn fetched(paths: Vec<&str>) -> Self {
        Self {
            files: paths.into_iter().map(PathBuf::from).collect(),
            error: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// The first download fails with the given error.
    pub fn failed(error: FetchError) -> Self {
        Self {
            files: Vec::new(),
            error: Arc::new(RwLock::new(Some(error))),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn recorded_urls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl GalleryDownloader for MockGalleryDownloader {
    fn name(&self) -> &str {
        "mock-gallery"
    }

    async fn download(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.calls.write().await.push(url.to_string());
        tokio::task::yield_now().await;
        if let Some(error) = self.error.write().await.take() {
            return Err(error);
        }
        Ok(FetchResult {
            files: self.files.iter().map(MediaFile::new).collect(),
            from_gallery: true,
        })
    }

    async fn validate(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
