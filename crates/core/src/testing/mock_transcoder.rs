//! Mock transcoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transcode::{TranscodeError, Transcoder};

/// Mock implementation of the [`Transcoder`] trait.
///
/// Records compose/optimize/remux calls, writes a small placeholder file
/// at the requested output path when it can, and can be configured to
/// fail every operation.
pub struct MockTranscoder {
    failing: bool,
    failing_optimize: bool,
    duration_secs: Arc<RwLock<f64>>,
    compose_calls: Arc<RwLock<Vec<PathBuf>>>,
    optimize_calls: Arc<RwLock<Vec<PathBuf>>>,
    remux_calls: Arc<RwLock<Vec<PathBuf>>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self {
            failing: false,
            failing_optimize: false,
            duration_secs: Arc::new(RwLock::new(12.0)),
            compose_calls: Arc::new(RwLock::new(Vec::new())),
            optimize_calls: Arc::new(RwLock::new(Vec::new())),
            remux_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A transcoder where every operation fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// A transcoder where only the re-encode fails; the remux still works.
    pub fn failing_optimize() -> Self {
        Self {
            failing_optimize: true,
            ..Self::new()
        }
    }

    /// Sets the duration every probe reports.
    pub async fn set_duration(&self, secs: f64) {
        *self.duration_secs.write().await = secs;
    }

    pub async fn compose_calls(&self) -> usize {
        self.compose_calls.read().await.len()
    }

    pub async fn optimize_calls(&self) -> usize {
        self.optimize_calls.read().await.len()
    }

    pub async fn remux_calls(&self) -> usize {
        self.remux_calls.read().await.len()
    }

    /// Output paths of recorded compose calls.
    pub async fn composed_outputs(&self) -> Vec<PathBuf> {
        self.compose_calls.read().await.clone()
    }

    fn fail(&self) -> Result<(), TranscodeError> {
        if self.failing {
            Err(TranscodeError::transcode_failed("mock failure", None))
        } else {
            Ok(())
        }
    }

    async fn write_placeholder(output: &Path) {
        // Lets cleanup assertions see a real file; errors are fine when the
        // test uses paths that do not exist.
        let _ = tokio::fs::write(output, b"mock output").await;
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe_duration(&self, _path: &Path) -> Result<f64, TranscodeError> {
        self.fail()?;
        Ok(*self.duration_secs.read().await)
    }

    async fn compose_slideshow(
        &self,
        _images: &[&Path],
        _audio: &Path,
        output: &Path,
    ) -> Result<(), TranscodeError> {
        self.compose_calls.write().await.push(output.to_path_buf());
        self.fail()?;
        Self::write_placeholder(output).await;
        Ok(())
    }

    async fn optimize_video(&self, _input: &Path, output: &Path) -> Result<(), TranscodeError> {
        self.optimize_calls.write().await.push(output.to_path_buf());
        self.fail()?;
        if self.failing_optimize {
            return Err(TranscodeError::transcode_failed("mock optimize failure", None));
        }
        Self::write_placeholder(output).await;
        Ok(())
    }

    async fn remux_faststart(&self, _input: &Path, output: &Path) -> Result<(), TranscodeError> {
        self.remux_calls.write().await.push(output.to_path_buf());
        self.fail()?;
        Self::write_placeholder(output).await;
        Ok(())
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        self.fail()
    }
}
