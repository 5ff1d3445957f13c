//! Trait definitions for the delivery module.

use async_trait::async_trait;

use super::types::{DeliveryError, RequestContext, StatusMessage};
use crate::media::MediaFile;

/// The messaging platform seam.
///
/// Implementations handle the grouping policy for mixed file sets: photos
/// go out grouped (caption on the first item), then the first video, then
/// the first audio track, with the caption used at most once.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Posts a new status message, replying to the original message when
    /// one is given.
    async fn send_status(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<StatusMessage, DeliveryError>;

    /// Edits a status message in place. Editing to the text the message
    /// already shows is not an error.
    async fn edit_status(&self, status: &StatusMessage, text: &str)
        -> Result<(), DeliveryError>;

    /// Deletes a status message. Deleting one that is already gone is not
    /// an error.
    async fn delete_status(&self, status: &StatusMessage) -> Result<(), DeliveryError>;

    /// Uploads a file set to the chat. Returns whether anything was
    /// actually sent.
    async fn send_media(
        &self,
        ctx: &RequestContext,
        files: &[MediaFile],
        caption: Option<&str>,
    ) -> Result<bool, DeliveryError>;
}
