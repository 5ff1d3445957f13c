//! Transient-file lifecycle tracking.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::metrics;

/// Collects every file a pipeline run produces so cleanup can run exactly
/// once, whatever path the run took to finish.
///
/// Consumed by value: once cleaned up the tracker is gone, so a path can
/// never be deleted twice.
#[derive(Debug, Default)]
pub struct TransientFileTracker {
    paths: Vec<PathBuf>,
}

impl TransientFileTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file for cleanup. Duplicates are tolerated here and
    /// collapsed at cleanup time.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Removes every distinct tracked file. Missing files are fine, they
    /// were consumed or never written. Returns the number of distinct
    /// paths attempted.
    pub async fn cleanup(self) -> usize {
        let distinct: HashSet<PathBuf> = self.paths.into_iter().collect();
        let attempted = distinct.len();

        for path in distinct {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    metrics::FILES_CLEANED.inc();
                    tracing::debug!(file = %path.display(), "removed transient file");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(file = %path.display(), "transient file already gone");
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "failed to remove transient file");
                }
            }
        }
        attempted
    }
}
