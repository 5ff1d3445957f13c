//! Outcome and error types for media acquisition.

use thiserror::Error;

use crate::media::MediaFile;

/// Files produced by one successful download attempt.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Downloaded files. Images are sorted by filename index, at most one
    /// audio track survives.
    pub files: Vec<MediaFile>,
    /// Whether the gallery fallback produced these files.
    pub from_gallery: bool,
}

/// Outcome of a primary download attempt.
///
/// `Ambiguous` is not a failure: it means the URL may point at an image
/// gallery the video downloader cannot handle, and the caller should try
/// the gallery fallback.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(FetchResult),
    Ambiguous { detail: String },
    Failed(FetchError),
}

/// Errors that can occur while acquiring media.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The post no longer exists or was never there.
    #[error("Content not found")]
    NotFound,

    /// The account or post is private.
    #[error("This content is from a private account")]
    Private,

    /// The site demands an authenticated session.
    #[error("This content requires a logged-in session")]
    LoginRequired,

    /// Age gate that cookies did not clear.
    #[error("This content is age-restricted")]
    AgeRestricted,

    /// Unavailable in the server's region.
    #[error("This content is not available in this region")]
    GeoRestricted,

    /// Taken down for copyright reasons.
    #[error("This content was removed for copyright reasons")]
    CopyrightBlocked,

    /// The file exceeds the configured fetch ceiling.
    #[error("File is too large (over {limit_mb} MB)")]
    TooLarge { limit_mb: u64 },

    /// Live streams are not downloadable.
    #[error("Live streams are not supported")]
    LiveUnsupported,

    /// The download finished but produced no usable media files.
    #[error("No media found at this link")]
    NoMedia,

    /// Downloader binary missing from the host.
    #[error("Downloader tool not found: {tool}")]
    ToolMissing { tool: String },

    /// The downloader exited nonzero for a reason outside the taxonomy.
    #[error("Download tool failed: {detail}")]
    Tool { detail: String },

    /// Subprocess ran past its timeout and was killed.
    #[error("Download timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while handling downloaded files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error("Unexpected download error: {detail}")]
    Unexpected { detail: String },
}

impl FetchError {
    pub fn tool(detail: impl Into<String>) -> Self {
        Self::Tool {
            detail: detail.into(),
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::Unexpected {
            detail: detail.into(),
        }
    }

    /// Short text shown to the chat when this failure is terminal.
    pub fn user_message(&self) -> String {
        match self {
            Self::Tool { .. } | Self::Unexpected { .. } | Self::Io(_) => {
                "Download failed".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_tool_detail() {
        let err = FetchError::tool("yt-dlp exited with code 1: traceback ...");
        assert_eq!(err.user_message(), "Download failed");
        assert_eq!(
            FetchError::Private.user_message(),
            "This content is from a private account"
        );
    }

}
