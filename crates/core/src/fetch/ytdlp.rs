//! yt-dlp subprocess downloader.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use super::traits::VideoDownloader;
use super::types::{FetchError, FetchOutcome, FetchResult};
use crate::config::DownloaderConfig;
use crate::media::{MediaFile, MediaKind};

/// Format chain: best avc/m4a pair capped at 1440p, degrading toward
/// whatever the site offers. Merged into mp4.
const FORMAT_CHAIN: &str = "bestvideo[ext=mp4][vcodec^=avc][height<=1440]+bestaudio[ext=m4a][acodec^=mp4a]/\
bestvideo[ext=mp4][vcodec^=avc][height<=1440]+bestaudio[ext=m4a]/\
best[ext=mp4][vcodec^=avc][height<=1440]/best[ext=mp4][height<=1440]/\
bestvideo[vcodec^=avc]+bestaudio/\
bestvideo[height<=1440]+bestaudio/best[height<=1440]/\
bestvideo+bestaudio/best";

/// Stderr fragments that suggest the URL points at a photo post or
/// slideshow rather than a video. Only meaningful for hosts where
/// galleries exist.
const AMBIGUOUS_MARKERS: &[&str] = &[
    "unsupported url",
    "no supported formats found",
    "not a video",
    "are you sure this is a video url?",
    "story",
    "photo",
    "image",
    "graphql error",
    "login required",
    "this post contains no media",
    "age restricted",
    "private content",
];

/// Files below this are treated as downloader debris, not media.
const MIN_FILE_SIZE_BYTES: u64 = 1024;

/// Primary downloader built on the yt-dlp CLI.
pub struct YtDlpDownloader {
    config: DownloaderConfig,
}

impl YtDlpDownloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    fn cookie_file_for(&self, url: &str) -> Option<&Path> {
        let host = host_of(url)?;
        if host.contains("instagram.com") {
            self.config.instagram_cookie_file.as_deref()
        } else if host.contains("tiktok.com") {
            self.config.tiktok_cookie_file.as_deref()
        } else {
            None
        }
        .filter(|p| {
            let ok = p.is_file();
            if !ok {
                tracing::warn!(path = %p.display(), "cookie file configured but not found");
            }
            ok
        })
    }

    async fn run(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let prefix = format!("reelgrab_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let out_template = self
            .config
            .temp_dir
            .join(format!("{prefix}_%(id)s.%(ext)s"));

        let mut cmd = Command::new(&self.config.yt_dlp_path);
        cmd.arg("-f")
            .arg(FORMAT_CHAIN)
            .arg("-o")
            .arg(&out_template)
            .arg("--merge-output-format")
            .arg("mp4")
            .arg("--max-filesize")
            .arg(self.config.max_file_size_bytes.to_string())
            .arg("--no-progress")
            .arg("--no-playlist");

        if let Some(cookie_file) = self.cookie_file_for(url) {
            tracing::debug!(path = %cookie_file.display(), "using cookie file");
            cmd.arg("--cookies").arg(cookie_file);
        }

        cmd.arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::info!(url, "starting yt-dlp download");

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FetchError::ToolMissing {
                    tool: self.config.yt_dlp_path.display().to_string(),
                }
            } else {
                FetchError::Io(e)
            }
        })?;

        let timeout_secs = self.config.timeout_secs;
        let output = match timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                // wait_with_output consumed the child; sweep whatever it
                // left behind and report the timeout.
                sweep_partial_files(&self.config.temp_dir, &prefix).await;
                return Err(FetchError::Timeout { timeout_secs });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            sweep_partial_files(&self.config.temp_dir, &prefix).await;
            return Ok(self.classify_failure(url, &stderr));
        }

        let files = collect_prefixed_media(&self.config.temp_dir, &prefix).await?;
        if files.is_empty() {
            tracing::warn!(url, "yt-dlp exited 0 but produced no usable files");
            if is_gallery_capable(url) {
                return Ok(FetchOutcome::Ambiguous {
                    detail: "no video files produced, possibly a photo post".to_string(),
                });
            }
            return Ok(FetchOutcome::Failed(FetchError::NoMedia));
        }

        // Prefer the merged mp4 and drop leftover intermediate tracks.
        let kept = if let Some(merged) = files
            .iter()
            .find(|f| {
                f.path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("mp4"))
            })
            .cloned()
        {
            for extra in files.iter().filter(|f| f.path != merged.path) {
                tracing::debug!(file = %extra.file_name(), "removing intermediate file");
                let _ = tokio::fs::remove_file(&extra.path).await;
            }
            vec![merged]
        } else {
            let mut files = files;
            files.sort_by(|a, b| a.path.cmp(&b.path));
            files
        };

        tracing::info!(url, files = kept.len(), "yt-dlp download complete");
        Ok(FetchOutcome::Fetched(FetchResult {
            files: kept,
            from_gallery: false,
        }))
    }

    /// Maps a nonzero yt-dlp exit to either the gallery-fallback signal or
    /// a terminal error from the taxonomy.
    fn classify_failure(&self, url: &str, stderr: &str) -> FetchOutcome {
        let err = stderr.to_ascii_lowercase();
        tracing::debug!(url, stderr = %stderr.trim(), "yt-dlp failed");

        if is_gallery_capable(url) && AMBIGUOUS_MARKERS.iter().any(|m| err.contains(m)) {
            let detail = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("")
                .trim()
                .to_string();
            return FetchOutcome::Ambiguous { detail };
        }

        let error = if err.contains("private video") || err.contains("private account") {
            FetchError::Private
        } else if err.contains("geo-restricted") || err.contains("unavailable in your country") {
            FetchError::GeoRestricted
        } else if err.contains("copyright") {
            FetchError::CopyrightBlocked
        } else if err.contains("max_filesize") || err.contains("max-filesize") {
            FetchError::TooLarge {
                limit_mb: self.config.max_file_size_bytes / (1024 * 1024),
            }
        } else if err.contains("404 not found") || err.contains("unable to download webpage") {
            FetchError::NotFound
        } else if err.contains("live event") || err.contains("premiere") {
            FetchError::LiveUnsupported
        } else if err.contains("sign in") || err.contains("login required") {
            FetchError::LoginRequired
        } else if err.contains("age restricted") || err.contains("age-restricted") {
            FetchError::AgeRestricted
        } else {
            let first_error_line = stderr
                .lines()
                .find(|l| l.to_ascii_lowercase().contains("error"))
                .unwrap_or("yt-dlp exited with an error")
                .trim()
                .to_string();
            FetchError::tool(first_error_line)
        };

        FetchOutcome::Failed(error)
    }
}

#[async_trait]
impl VideoDownloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn download(&self, url: &str) -> FetchOutcome {
        match self.run(url).await {
            Ok(outcome) => outcome,
            Err(e) => FetchOutcome::Failed(e),
        }
    }

    async fn validate(&self) -> Result<(), FetchError> {
        let result = Command::new(&self.config.yt_dlp_path)
            .arg("--version")
            .output()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::ToolMissing {
                    tool: self.config.yt_dlp_path.display().to_string(),
                })
            }
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

/// Whether this host can serve photo posts or slideshows that the video
/// downloader cannot fetch.
pub(crate) fn is_gallery_capable(url: &str) -> bool {
    host_of(url)
        .map(|h| h.contains("tiktok.com") || h.contains("instagram.com"))
        .unwrap_or(false)
}

fn host_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Lists media files in `dir` whose names start with `prefix`, skipping
/// debris below the minimum size.
pub(crate) async fn collect_prefixed_media(
    dir: &Path,
    prefix: &str,
) -> Result<Vec<MediaFile>, FetchError> {
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() || meta.len() <= MIN_FILE_SIZE_BYTES {
            continue;
        }
        let file = MediaFile::new(path);
        if file.kind != MediaKind::Unknown {
            found.push(file);
        }
    }
    Ok(found)
}

/// Removes files a failed or interrupted download left behind.
pub(crate) async fn sweep_partial_files(dir: &Path, prefix: &str) {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_ours = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        if is_ours {
            tracing::debug!(file = %path.display(), "sweeping partial download");
            let _ = tokio::fs::remove_file(&path).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloaderConfig;

    fn downloader() -> YtDlpDownloader {
        YtDlpDownloader::new(DownloaderConfig::default())
    }

    #[test]
    fn test_gallery_capable_hosts() {
        assert!(is_gallery_capable("https://www.tiktok.com/@u/video/1"));
        assert!(is_gallery_capable("https://instagram.com/p/abc"));
        assert!(!is_gallery_capable("https://youtu.be/abc"));
        assert!(!is_gallery_capable("not a url"));
    }

    #[test]
    fn test_classify_private() {
        let outcome = downloader().classify_failure(
            "https://youtube.com/watch?v=x",
            "ERROR: Private video. Sign in if you've been granted access",
        );
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::Private)
        ));
    }

    #[test]
    fn test_classify_too_large() {
        let outcome = downloader().classify_failure(
            "https://youtube.com/watch?v=x",
            "ERROR: file is larger than max_filesize",
        );
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::TooLarge { limit_mb: 250 })
        ));
    }

    #[test]
    fn test_ambiguous_only_on_gallery_hosts() {
        let d = downloader();
        let stderr = "ERROR: Unsupported URL: maybe a photo";

        let tiktok = d.classify_failure("https://www.tiktok.com/@u/photo/1", stderr);
        assert!(matches!(tiktok, FetchOutcome::Ambiguous { .. }));

        let youtube = d.classify_failure("https://youtube.com/watch?v=x", stderr);
        assert!(matches!(youtube, FetchOutcome::Failed(FetchError::Tool { .. })));
    }

    #[test]
    fn test_classify_live() {
        let outcome = downloader().classify_failure(
            "https://youtube.com/watch?v=x",
            "ERROR: this video is a live event",
        );
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::LiveUnsupported)
        ));
    }

    #[tokio::test]
    async fn test_collect_prefixed_media_filters() {
        let dir = tempfile::tempdir().unwrap();
        let big = vec![0u8; 2048];

        tokio::fs::write(dir.path().join("pre_a.mp4"), &big).await.unwrap();
        tokio::fs::write(dir.path().join("pre_b.json"), &big).await.unwrap();
        tokio::fs::write(dir.path().join("pre_tiny.mp4"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("other_c.mp4"), &big).await.unwrap();

        let found = collect_prefixed_media(dir.path(), "pre_").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name(), "pre_a.mp4");
    }

    #[tokio::test]
    async fn test_sweep_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("pre_a.part"), b"xx").await.unwrap();
        tokio::fs::write(dir.path().join("keep.mp4"), b"xx").await.unwrap();

        sweep_partial_files(dir.path(), "pre_").await;

        assert!(!dir.path().join("pre_a.part").exists());
        assert!(dir.path().join("keep.mp4").exists());
    }
}
