//! Request context, captions and delivery errors.

use thiserror::Error;

/// One link-processing request as seen by the delivery layer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Destination chat.
    pub chat_id: i64,
    /// HTML mention of the user who shared the link, already escaped.
    pub presenter: Option<String>,
    /// Free text that followed the link in the original message.
    pub extra_text: Option<String>,
    /// Message id the status message should reply to, when the original
    /// message still exists.
    pub reply_to: Option<i64>,
}

/// Handle to a status message the bot posted and keeps editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Builds the delivery caption: attribution line first, then the user's
/// own text escaped for HTML.
pub fn build_caption(presenter: Option<&str>, extra_text: Option<&str>) -> Option<String> {
    let mut caption = String::new();
    if let Some(mention) = presenter {
        caption.push_str("Sent by ");
        caption.push_str(mention);
    }
    if let Some(extra) = extra_text.filter(|t| !t.trim().is_empty()) {
        if !caption.is_empty() {
            caption.push_str("\n\n");
        }
        caption.push_str(&escape_html(extra.trim()));
    }
    (!caption.is_empty()).then_some(caption)
}

/// Escapes text for inclusion in HTML-formatted message bodies.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Errors that can occur while talking to the messaging platform.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The bot lacks rights in the chat.
    #[error("Bot lacks permission in this chat")]
    PermissionDenied,

    /// The platform refused the upload for size.
    #[error("File exceeds the platform upload limit")]
    PayloadTooLarge,

    /// Caption markup the platform could not parse.
    #[error("Caption could not be parsed")]
    MalformedCaption,

    /// A file vanished between fetch and upload.
    #[error("File disappeared before upload: {path}")]
    FileVanished { path: String },

    /// The message an edit targeted no longer exists.
    #[error("Message to edit no longer exists")]
    EditTargetLost,

    /// Any other API-level failure.
    #[error("Messaging API error: {detail}")]
    Api { detail: String },
}

impl DeliveryError {
    pub fn api(detail: impl Into<String>) -> Self {
        Self::Api {
            detail: detail.into(),
        }
    }

    /// Short text shown to the chat when delivery fails terminally.
    pub fn user_message(&self, upload_limit_bytes: u64) -> String {
        match self {
            Self::PayloadTooLarge => format!(
                "Sending failed: file is larger than the {} MB upload limit",
                upload_limit_bytes / (1000 * 1000)
            ),
            Self::PermissionDenied => "Sending failed: missing permissions".to_string(),
            _ => "Sending failed".to_string(),
        }
    }
}
