pub mod config;
pub mod delivery;
pub mod fetch;
pub mod links;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod testing;
pub mod transcode;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError,
};
pub use delivery::{build_caption, DeliveryError, Messenger, RequestContext, StatusMessage};
pub use fetch::{
    FetchError, FetchOutcome, FetchResult, GalleryDlDownloader, GalleryDownloader, MediaFetcher,
    VideoDownloader, YtDlpDownloader,
};
pub use media::{MediaFile, MediaKind};
pub use pipeline::{LinkPipeline, LoadingIndicator, PipelinePhase, TransientFileTracker};
pub use transcode::{FfmpegTranscoder, TranscodeError, Transcoder};
