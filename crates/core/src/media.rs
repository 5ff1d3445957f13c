//! Media file handles and filename-based ordering.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions recognized as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Extensions recognized as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Extensions recognized as audio tracks.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "ogg", "aac", "opus", "wav"];

/// Sort index used for filenames that carry no recognizable number.
/// Large enough to place them after any real gallery index.
pub const NO_INDEX_SENTINEL: u64 = 99_999;

/// Classification of a media file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Unknown,
}

impl MediaKind {
    /// Derives the kind from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Unknown;
        };
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Audio
        } else {
            Self::Unknown
        }
    }

    /// Whether this kind is usable media at all.
    pub fn is_media(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// A reference to a downloaded or generated file on local storage.
///
/// Exclusively owned by the pipeline run that produced it until it is
/// handed off for upload and then for cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = MediaKind::from_path(&path);
        Self { path, kind }
    }

    /// Filename without directory, for logging.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Extracts a numeric sort index from a filename stem.
///
/// Gallery tools name sequence files like `3.jpg`, `img_007.png` or
/// `prefix-12.webp`. Three passes of decreasing specificity:
/// 1. digits after a separator (`_`, `-`, space) at the end of the stem
/// 2. digits at the end of the stem
/// 3. the first run of digits anywhere in the stem
///
/// Returns [`NO_INDEX_SENTINEL`] when no digits are found, so such files
/// sort last. Stems with several runs of digits resolve to the end-of-stem
/// run when one exists, otherwise the first run.
pub fn extract_filename_index(path: &Path) -> u64 {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let passes = [r"[_\s-](\d+)$", r"(\d+)$", r"(\d+)"];
    for pattern in passes {
        let re = Regex::new(pattern).expect("static pattern");
        if let Some(caps) = re.captures(&stem) {
            if let Some(m) = caps.get(1) {
                if let Ok(idx) = m.as_str().parse::<u64>() {
                    return idx;
                }
            }
        }
    }

    tracing::debug!(stem, "no numeric index in filename, sorting last");
    NO_INDEX_SENTINEL
}

/// Sorts files in place by their filename index.
///
/// Stable: files without an index keep their discovery order at the end.
pub fn sort_by_filename_index(files: &mut [MediaFile]) {
    files.sort_by_key(|f| extract_filename_index(&f.path));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MediaKind::from_path(Path::new("/tmp/a.JPG")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("/tmp/a.webm")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("/tmp/a.opus")), MediaKind::Audio);
        assert_eq!(MediaKind::from_path(Path::new("/tmp/a.json")), MediaKind::Unknown);
        assert_eq!(MediaKind::from_path(Path::new("/tmp/noext")), MediaKind::Unknown);
    }

    #[test]
    fn test_index_plain_number() {
        assert_eq!(extract_filename_index(Path::new("3.jpg")), 3);
    }

    #[test]
    fn test_index_after_separator() {
        assert_eq!(extract_filename_index(Path::new("img_007.png")), 7);
        assert_eq!(extract_filename_index(Path::new("photo-12.webp")), 12);
    }

    #[test]
    fn test_index_missing() {
        assert_eq!(extract_filename_index(Path::new("cover.png")), NO_INDEX_SENTINEL);
    }

    #[test]
    fn test_index_multiple_numbers_prefers_trailing() {
        assert_eq!(extract_filename_index(Path::new("photo_2023_05.jpg")), 5);
    }

    #[test]
    fn test_index_embedded_digits_fallback() {
        assert_eq!(extract_filename_index(Path::new("a12b.jpg")), 12);
    }

    #[test]
    fn test_sort_order() {
        let mut files: Vec<MediaFile> = ["cover.png", "2.jpg", "10.jpg", "1.jpg"]
            .iter()
            .map(|n| MediaFile::new(format!("/tmp/{n}")))
            .collect();
        sort_by_filename_index(&mut files);
        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["1.jpg", "2.jpg", "10.jpg", "cover.png"]);
    }

    #[test]
    fn test_sort_is_stable_for_unindexed() {
        let mut files: Vec<MediaFile> = ["b.png", "a.png", "1.png"]
            .iter()
            .map(|n| MediaFile::new(format!("/tmp/{n}")))
            .collect();
        sort_by_filename_index(&mut files);
        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["1.png", "b.png", "a.png"]);
    }
}
