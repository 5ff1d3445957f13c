//! Media acquisition: external downloader invocation and fallback pairing.

mod fetcher;
mod gallerydl;
mod traits;
mod types;
mod ytdlp;

pub use fetcher::MediaFetcher;
pub use gallerydl::GalleryDlDownloader;
pub use traits::{GalleryDownloader, VideoDownloader};
pub use types::{FetchError, FetchOutcome, FetchResult};
pub use ytdlp::YtDlpDownloader;
