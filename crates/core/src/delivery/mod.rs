//! Delivery types and the messaging seam.

mod traits;
mod types;

pub use traits::Messenger;
pub use types::{build_caption, escape_html, DeliveryError, RequestContext, StatusMessage};
