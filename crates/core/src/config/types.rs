use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Bot API token
    pub token: String,
    /// Restrict group handling to this chat id (any group when unset)
    #[serde(default)]
    pub target_group_id: Option<i64>,
    /// Long-poll timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u32,
}

fn default_poll_timeout() -> u32 {
    30
}

/// External downloader configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    #[serde(default = "default_yt_dlp_path")]
    pub yt_dlp_path: PathBuf,
    #[serde(default = "default_gallery_dl_path")]
    pub gallery_dl_path: PathBuf,
    /// Ceiling for any single fetched file; yt-dlp aborts above it
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Netscape cookie file passed for instagram.com URLs
    #[serde(default)]
    pub instagram_cookie_file: Option<PathBuf>,
    /// Netscape cookie file passed for tiktok.com URLs
    #[serde(default)]
    pub tiktok_cookie_file: Option<PathBuf>,
    /// Shared area for downloaded and generated files
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Subprocess timeout for one download attempt
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: default_yt_dlp_path(),
            gallery_dl_path: default_gallery_dl_path(),
            max_file_size_bytes: default_max_file_size(),
            instagram_cookie_file: None,
            tiktok_cookie_file: None,
            temp_dir: default_temp_dir(),
            timeout_secs: default_download_timeout(),
        }
    }
}

fn default_yt_dlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_gallery_dl_path() -> PathBuf {
    PathBuf::from("gallery-dl")
}

fn default_max_file_size() -> u64 {
    250 * 1024 * 1024
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_download_timeout() -> u64 {
    600
}

/// Transcoding configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
    /// Compose image+audio galleries into a slideshow video
    #[serde(default = "default_true")]
    pub convert_slideshows: bool,
    /// Subprocess timeout for one ffmpeg invocation
    #[serde(default = "default_transcode_timeout")]
    pub timeout_secs: u64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            convert_slideshows: default_true(),
            timeout_secs: default_transcode_timeout(),
        }
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_true() -> bool {
    true
}

fn default_transcode_timeout() -> u64 {
    300
}

/// Delivery (upload) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Platform upload ceiling, distinct from the fetch ceiling: a large
    /// fetch can still be optimized below this before upload
    #[serde(default = "default_upload_limit")]
    pub upload_limit_bytes: u64,
    /// Maximum photos in one grouped post
    #[serde(default = "default_media_group_cap")]
    pub media_group_cap: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            upload_limit_bytes: default_upload_limit(),
            media_group_cap: default_media_group_cap(),
        }
    }
}

fn default_upload_limit() -> u64 {
    50 * 1000 * 1000
}

fn default_media_group_cap() -> usize {
    10
}

/// Pipeline behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Loading-indicator animation interval
    #[serde(default = "default_indicator_interval")]
    pub indicator_interval_ms: u64,
    /// Bounded wait for an indicator task to observe its stop signal
    /// before being force-cancelled
    #[serde(default = "default_indicator_stop_timeout")]
    pub indicator_stop_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            indicator_interval_ms: default_indicator_interval(),
            indicator_stop_timeout_ms: default_indicator_stop_timeout(),
        }
    }
}

fn default_indicator_interval() -> u64 {
    1000
}

fn default_indicator_stop_timeout() -> u64 {
    500
}
