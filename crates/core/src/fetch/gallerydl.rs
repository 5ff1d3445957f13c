//! gallery-dl subprocess downloader, the fallback for photo posts and
//! slideshows.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use super::traits::GalleryDownloader;
use super::types::{FetchError, FetchResult};
use crate::config::DownloaderConfig;
use crate::media::{sort_by_filename_index, MediaFile, MediaKind};

/// Fallback downloader built on the gallery-dl CLI.
pub struct GalleryDlDownloader {
    config: DownloaderConfig,
}

impl GalleryDlDownloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    fn cookie_file_for(&self, url: &str) -> Option<&Path> {
        let parsed = url::Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        if host.contains("instagram.com") {
            self.config.instagram_cookie_file.as_deref()
        } else if host.contains("tiktok.com") {
            self.config.tiktok_cookie_file.as_deref()
        } else {
            None
        }
        .filter(|p| p.is_file())
    }

    async fn run(&self, url: &str) -> Result<FetchResult, FetchError> {
        // Download into a private scratch dir, then move survivors to the
        // shared temp area under a unique prefix.
        let scratch = self
            .config
            .temp_dir
            .join(format!("gdl_tmp_{}", Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&scratch).await?;

        let result = self.run_in_scratch(url, &scratch).await;

        let _ = tokio::fs::remove_dir_all(&scratch).await;
        result
    }

    async fn run_in_scratch(&self, url: &str, scratch: &Path) -> Result<FetchResult, FetchError> {
        let mut cmd = Command::new(&self.config.gallery_dl_path);
        cmd.arg("--directory")
            .arg(scratch)
            .arg("--no-mtime")
            .arg("--option")
            .arg("extractor.tiktok.redirect=true");

        if let Some(cookie_file) = self.cookie_file_for(url) {
            tracing::debug!(path = %cookie_file.display(), "using cookie file");
            cmd.arg("--cookies").arg(cookie_file);
        }

        cmd.arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::info!(url, "starting gallery-dl download");

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FetchError::ToolMissing {
                    tool: self.config.gallery_dl_path.display().to_string(),
                }
            } else {
                FetchError::Io(e)
            }
        })?;

        let timeout_secs = self.config.timeout_secs;
        let output = timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| FetchError::Timeout { timeout_secs })??;

        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(classify_gallery_failure(&stderr));
        }

        let sorted = self.classify_and_move(scratch).await?;
        if sorted.is_empty() {
            let err = stderr.to_ascii_lowercase();
            if err.contains("warning") || err.contains("nothing to download") {
                tracing::warn!(url, "gallery-dl reported nothing new to download");
            } else {
                tracing::error!(url, "gallery-dl exited 0 but produced no files");
            }
            return Err(FetchError::NoMedia);
        }

        tracing::info!(url, files = sorted.len(), "gallery-dl download complete");
        Ok(FetchResult {
            files: sorted,
            from_gallery: true,
        })
    }

    /// Classifies scratch files by extension and moves survivors into the
    /// shared temp dir. Images come first (sorted by filename index), then
    /// videos, then at most one audio track.
    async fn classify_and_move(&self, scratch: &Path) -> Result<Vec<MediaFile>, FetchError> {
        let prefix = format!("reelgrab_gdl_{}", &Uuid::new_v4().simple().to_string()[..8]);

        let mut images: Vec<MediaFile> = Vec::new();
        let mut videos: Vec<MediaFile> = Vec::new();
        let mut audio: Option<MediaFile> = None;

        let mut entries = tokio::fs::read_dir(scratch).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            // Metadata sidecars are not media.
            if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"))
            {
                continue;
            }

            let kind = MediaKind::from_path(&path);
            if kind == MediaKind::Unknown {
                tracing::debug!(file = %path.display(), "ignoring non-media file");
                continue;
            }

            // Extra audio tracks lose to the first one found.
            if kind == MediaKind::Audio && audio.is_some() {
                tracing::warn!(file = %path.display(), "discarding extra audio track");
                continue;
            }

            let dest = self.move_to_shared_temp(&path, &prefix).await?;
            let file = MediaFile::new(dest);
            match kind {
                MediaKind::Image => images.push(file),
                MediaKind::Video => videos.push(file),
                MediaKind::Audio => audio = Some(file),
                MediaKind::Unknown => unreachable!(),
            }
        }

        sort_by_filename_index(&mut images);

        let mut sorted = images;
        sorted.extend(videos);
        sorted.extend(audio);
        Ok(sorted)
    }

    /// Moves a scratch file to the shared temp dir, probing with a counter
    /// suffix until the destination name is free.
    async fn move_to_shared_temp(
        &self,
        src: &Path,
        prefix: &str,
    ) -> Result<PathBuf, FetchError> {
        let stem = src
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = src
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut dest = self.config.temp_dir.join(format!("{prefix}_{stem}{ext}"));
        let mut count = 1;
        while dest.exists() {
            dest = self
                .config
                .temp_dir
                .join(format!("{prefix}_{stem}_{count}{ext}"));
            count += 1;
        }

        tokio::fs::rename(src, &dest).await?;
        Ok(dest)
    }
}

fn classify_gallery_failure(stderr: &str) -> FetchError {
    let err = stderr.to_ascii_lowercase();
    if err.contains("404 not found") || err.contains("unavailable") {
        FetchError::NotFound
    } else if err.contains("login required") || err.contains("authentication required") {
        FetchError::LoginRequired
    } else if err.contains("private") {
        FetchError::Private
    } else if err.contains("age restricted") {
        FetchError::AgeRestricted
    } else if err.contains("no supported extractor found") {
        FetchError::NoMedia
    } else {
        let first_error_line = stderr
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("gallery-dl exited with an error")
            .trim()
            .to_string();
        FetchError::tool(first_error_line)
    }
}

#[async_trait]
impl GalleryDownloader for GalleryDlDownloader {
    fn name(&self) -> &str {
        "gallery-dl"
    }

    async fn download(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.run(url).await
    }

    async fn validate(&self) -> Result<(), FetchError> {
        let result = Command::new(&self.config.gallery_dl_path)
            .arg("--version")
            .output()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::ToolMissing {
                    tool: self.config.gallery_dl_path.display().to_string(),
                })
            }
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloaderConfig;

    fn downloader_with_temp(dir: &Path) -> GalleryDlDownloader {
        GalleryDlDownloader::new(DownloaderConfig {
            temp_dir: dir.to_path_buf(),
            ..DownloaderConfig::default()
        })
    }

    #[test]
    fn test_classify_gallery_failure() {
        assert!(matches!(
            classify_gallery_failure("gallery-dl: 404 Not Found"),
            FetchError::NotFound
        ));
        assert!(matches!(
            classify_gallery_failure("error: login required to view this"),
            FetchError::LoginRequired
        ));
        assert!(matches!(
            classify_gallery_failure("this profile is private"),
            FetchError::Private
        ));
        assert!(matches!(
            classify_gallery_failure("something else broke"),
            FetchError::Tool { .. }
        ));
    }

    #[tokio::test]
    async fn test_classify_and_move_orders_and_filters() {
        let shared = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let d = downloader_with_temp(shared.path());

        for name in ["2.jpg", "10.jpg", "1.jpg", "clip.mp4", "meta.json", "song.mp3"] {
            tokio::fs::write(scratch.path().join(name), b"data").await.unwrap();
        }

        let files = d.classify_and_move(scratch.path()).await.unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| {
                // Strip the random move prefix for comparison.
                let name = f.file_name();
                name.splitn(4, '_').nth(3).unwrap().to_string()
            })
            .collect();
        assert_eq!(names, vec!["1.jpg", "2.jpg", "10.jpg", "clip.mp4", "song.mp3"]);

        // Everything landed in the shared temp dir.
        assert!(files.iter().all(|f| f.path.parent() == Some(shared.path())));
    }

    #[tokio::test]
    async fn test_extra_audio_discarded() {
        let shared = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let d = downloader_with_temp(shared.path());

        tokio::fs::write(scratch.path().join("a.mp3"), b"data").await.unwrap();
        tokio::fs::write(scratch.path().join("b.mp3"), b"data").await.unwrap();

        let files = d.classify_and_move(scratch.path()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].kind, MediaKind::Audio);
    }

    #[tokio::test]
    async fn test_move_collision_probing() {
        let shared = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let d = downloader_with_temp(shared.path());

        tokio::fs::write(scratch.path().join("1.jpg"), b"data").await.unwrap();
        tokio::fs::write(shared.path().join("pre_1.jpg"), b"old").await.unwrap();

        let dest = d
            .move_to_shared_temp(&scratch.path().join("1.jpg"), "pre")
            .await
            .unwrap();
        assert_eq!(dest.file_name().unwrap().to_str().unwrap(), "pre_1_1.jpg");
    }
}
