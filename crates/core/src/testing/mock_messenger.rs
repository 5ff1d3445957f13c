//! Mock messenger for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::delivery::{DeliveryError, Messenger, RequestContext, StatusMessage};
use crate::media::MediaFile;

/// A recorded status message post.
#[derive(Debug, Clone)]
pub struct RecordedStatus {
    pub chat_id: i64,
    pub text: String,
    pub reply_to: Option<i64>,
}

/// A recorded successful status edit.
#[derive(Debug, Clone)]
pub struct RecordedEdit {
    pub message_id: i64,
    pub text: String,
}

/// A recorded media send.
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub chat_id: i64,
    pub files: Vec<MediaFile>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditMode {
    Succeed,
    LostTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendMode {
    Succeed,
    NothingSent,
    TooLarge,
    PermissionDenied,
}

/// Mock implementation of the [`Messenger`] trait.
///
/// Records every interaction and supports failure injection for edits
/// and media sends.
pub struct MockMessenger {
    statuses: Arc<RwLock<Vec<RecordedStatus>>>,
    edits: Arc<RwLock<Vec<RecordedEdit>>>,
    edit_attempts: Arc<RwLock<usize>>,
    deletes: Arc<RwLock<Vec<i64>>>,
    sends: Arc<RwLock<Vec<RecordedSend>>>,
    edit_mode: Arc<RwLock<EditMode>>,
    send_mode: Arc<RwLock<SendMode>>,
    next_message_id: Arc<RwLock<i64>>,
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            statuses: Arc::new(RwLock::new(Vec::new())),
            edits: Arc::new(RwLock::new(Vec::new())),
            edit_attempts: Arc::new(RwLock::new(0)),
            deletes: Arc::new(RwLock::new(Vec::new())),
            sends: Arc::new(RwLock::new(Vec::new())),
            edit_mode: Arc::new(RwLock::new(EditMode::Succeed)),
            send_mode: Arc::new(RwLock::new(SendMode::Succeed)),
            next_message_id: Arc::new(RwLock::new(100)),
        }
    }

    /// Every subsequent edit fails as if the message was deleted.
    pub async fn fail_edits_with_lost_target(&self) {
        *self.edit_mode.write().await = EditMode::LostTarget;
    }

    /// Media sends report that nothing was sent.
    pub async fn send_nothing(&self) {
        *self.send_mode.write().await = SendMode::NothingSent;
    }

    /// Media sends fail with [`DeliveryError::PayloadTooLarge`].
    pub async fn fail_sends_too_large(&self) {
        *self.send_mode.write().await = SendMode::TooLarge;
    }

    /// Media sends fail with [`DeliveryError::PermissionDenied`].
    pub async fn fail_sends_permission(&self) {
        *self.send_mode.write().await = SendMode::PermissionDenied;
    }

    pub async fn statuses(&self) -> Vec<RecordedStatus> {
        self.statuses.read().await.clone()
    }

    /// Successful edits only.
    pub async fn edits(&self) -> Vec<RecordedEdit> {
        self.edits.read().await.clone()
    }

    /// All edit attempts, successful or not.
    pub async fn edit_attempts(&self) -> usize {
        *self.edit_attempts.read().await
    }

    pub async fn deletes(&self) -> Vec<i64> {
        self.deletes.read().await.clone()
    }

    pub async fn sends(&self) -> Vec<RecordedSend> {
        self.sends.read().await.clone()
    }

    /// The text of the most recent successful edit, if any.
    pub async fn last_edit_text(&self) -> Option<String> {
        self.edits.read().await.last().map(|e| e.text.clone())
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_status(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<StatusMessage, DeliveryError> {
        self.statuses.write().await.push(RecordedStatus {
            chat_id,
            text: text.to_string(),
            reply_to,
        });
        let mut id = self.next_message_id.write().await;
        *id += 1;
        Ok(StatusMessage {
            chat_id,
            message_id: *id,
        })
    }

    async fn edit_status(
        &self,
        status: &StatusMessage,
        text: &str,
    ) -> Result<(), DeliveryError> {
        *self.edit_attempts.write().await += 1;
        match *self.edit_mode.read().await {
            EditMode::Succeed => {
                self.edits.write().await.push(RecordedEdit {
                    message_id: status.message_id,
                    text: text.to_string(),
                });
                Ok(())
            }
            EditMode::LostTarget => Err(DeliveryError::EditTargetLost),
        }
    }

    async fn delete_status(&self, status: &StatusMessage) -> Result<(), DeliveryError> {
        self.deletes.write().await.push(status.message_id);
        Ok(())
    }

    async fn send_media(
        &self,
        ctx: &RequestContext,
        files: &[MediaFile],
        caption: Option<&str>,
    ) -> Result<bool, DeliveryError> {
        // Give concurrent tasks (the loading indicator) a chance to run,
        // as a real upload would.
        tokio::task::yield_now().await;
        match *self.send_mode.read().await {
            SendMode::Succeed => {
                self.sends.write().await.push(RecordedSend {
                    chat_id: ctx.chat_id,
                    files: files.to_vec(),
                    caption: caption.map(str::to_string),
                });
                Ok(!files.is_empty())
            }
            SendMode::NothingSent => Ok(false),
            SendMode::TooLarge => Err(DeliveryError::PayloadTooLarge),
            SendMode::PermissionDenied => Err(DeliveryError::PermissionDenied),
        }
    }
}
