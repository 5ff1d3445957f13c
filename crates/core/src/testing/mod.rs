//! Testing utilities and mock implementations for pipeline tests.
//!
//! This module provides mock implementations of the external seams
//! (downloaders, transcoder, messenger), allowing full pipeline testing
//! without network access or installed tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use reelgrab_core::testing::{MockVideoDownloader, MockGalleryDownloader, MockMessenger};
//!
//! let video = MockVideoDownloader::ambiguous();
//! let gallery = MockGalleryDownloader::fetched(vec!["/tmp/1.jpg", "/tmp/2.jpg"]);
//! let messenger = MockMessenger::new();
//!
//! // Run the pipeline, then assert on messenger.sends().await ...
//! ```

mod mock_downloaders;
mod mock_messenger;
mod mock_transcoder;

pub use mock_downloaders::{MockGalleryDownloader, MockVideoDownloader};
pub use mock_messenger::{MockMessenger, RecordedEdit, RecordedSend, RecordedStatus};
pub use mock_transcoder::MockTranscoder;
