//! FFmpeg-backed probing, slideshow composition and upload optimization.

mod compose;
mod error;
mod ffmpeg;
mod optimize;
mod traits;

pub use compose::SlideshowComposer;
pub use error::TranscodeError;
pub use ffmpeg::FfmpegTranscoder;
pub use optimize::DeliveryOptimizer;
pub use traits::Transcoder;
