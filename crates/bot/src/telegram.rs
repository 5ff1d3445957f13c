//! Telegram Bot API client.
//!
//! Thin reqwest wrapper implementing the [`Messenger`] trait: long-poll
//! update fetching, status message editing, and media uploads with
//! `attach://` multipart parts for media groups.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use reelgrab_core::media::{extract_filename_index, MediaFile, MediaKind};
use reelgrab_core::{Config, DeliveryError, Messenger, RequestContext, StatusMessage};

use crate::types::{ApiResponse, InputMediaPhoto, Message, Update};

/// Overall request deadline; large uploads need headroom.
const REQUEST_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;

pub struct TelegramClient {
    http: Client,
    base_url: String,
    poll_timeout_secs: u32,
    media_group_cap: usize,
}

impl TelegramClient {
    pub fn new(config: &Config) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: format!("https://api.telegram.org/bot{}", config.bot.token),
            poll_timeout_secs: config.bot.poll_timeout_secs,
            media_group_cap: config.delivery.media_group_cap,
        }
    }

    /// Long-polls for new updates past `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, DeliveryError> {
        let url = format!("{}/getUpdates", self.base_url);
        let payload = json!({
            "offset": offset,
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message"],
        });

        // The server holds the request open for up to poll_timeout_secs.
        let response = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(u64::from(self.poll_timeout_secs) + 30))
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::api(format!("getUpdates: {e}")))?;

        Self::parse_response("getUpdates", response).await
    }

    /// Deletes a user message, e.g. the original link post in a group.
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), DeliveryError> {
        let payload = json!({ "chat_id": chat_id, "message_id": message_id });
        self.call::<Value>("deleteMessage", &payload).await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
    ) -> Result<T, DeliveryError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::api(format!("{method}: {e}")))?;

        Self::parse_response(method, response).await
    }

    async fn call_multipart(&self, method: &str, form: Form) -> Result<(), DeliveryError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DeliveryError::api(format!("{method}: {e}")))?;

        Self::parse_response::<Value>(method, response).await?;
        Ok(())
    }

    async fn parse_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, DeliveryError> {
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| DeliveryError::api(format!("{method}: invalid response: {e}")))?;

        if body.ok {
            body.result
                .ok_or_else(|| DeliveryError::api(format!("{method}: empty result")))
        } else {
            let description = body.description.as_deref().unwrap_or("unknown error");
            debug!(method, error_code = ?body.error_code, description, "API call rejected");
            Err(map_api_error(body.error_code, description))
        }
    }

    /// Reads a file into a multipart part. A missing file at this point
    /// vanished between fetch and upload.
    async fn file_part(&self, path: &Path) -> Result<Part, DeliveryError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeliveryError::FileVanished {
                    path: path.display().to_string(),
                }
            } else {
                DeliveryError::api(format!("reading {}: {e}", path.display()))
            }
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        Ok(Part::bytes(bytes).file_name(file_name))
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", self.file_part(path).await?);
        if let Some(caption) = caption {
            form = form
                .text("caption", caption.to_string())
                .text("parse_mode", "HTML");
        }
        self.call_multipart("sendPhoto", form).await
    }

    async fn send_video(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("supports_streaming", "true")
            .part("video", self.file_part(path).await?);
        if let Some(caption) = caption {
            form = form
                .text("caption", caption.to_string())
                .text("parse_mode", "HTML");
        }
        self.call_multipart("sendVideo", form).await
    }

    async fn send_audio(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("audio", self.file_part(path).await?);
        if let Some(caption) = caption {
            form = form
                .text("caption", caption.to_string())
                .text("parse_mode", "HTML");
        }
        self.call_multipart("sendAudio", form).await
    }

    async fn send_photo_group(
        &self,
        chat_id: i64,
        photos: &[&MediaFile],
        caption: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let mut form = Form::new().text("chat_id", chat_id.to_string());
        let mut items = Vec::with_capacity(photos.len());

        for (i, photo) in photos.iter().enumerate() {
            let name = format!("file{i}");
            let part = self.file_part(&photo.path).await?;
            let item_caption = if i == 0 {
                caption.map(str::to_string)
            } else {
                None
            };
            items.push(InputMediaPhoto::new(&name, item_caption));
            form = form.part(name, part);
        }

        let media =
            serde_json::to_string(&items).map_err(|e| DeliveryError::api(e.to_string()))?;
        form = form.text("media", media);
        self.call_multipart("sendMediaGroup", form).await
    }
}

/// Maps a Bot API rejection onto a [`DeliveryError`].
fn map_api_error(error_code: Option<i64>, description: &str) -> DeliveryError {
    let lower = description.to_ascii_lowercase();
    if error_code == Some(413)
        || lower.contains("request entity too large")
        || lower.contains("file is too big")
    {
        DeliveryError::PayloadTooLarge
    } else if error_code == Some(403) {
        DeliveryError::PermissionDenied
    } else if lower.contains("can't parse entities") {
        DeliveryError::MalformedCaption
    } else if lower.contains("message to edit not found")
        || lower.contains("message to delete not found")
    {
        DeliveryError::EditTargetLost
    } else {
        DeliveryError::api(description)
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_status(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<StatusMessage, DeliveryError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(reply_to) = reply_to {
            payload["reply_to_message_id"] = json!(reply_to);
        }

        let message: Message = self.call("sendMessage", &payload).await?;
        Ok(StatusMessage {
            chat_id,
            message_id: message.message_id,
        })
    }

    async fn edit_status(&self, status: &StatusMessage, text: &str) -> Result<(), DeliveryError> {
        let payload = json!({
            "chat_id": status.chat_id,
            "message_id": status.message_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        match self.call::<Value>("editMessageText", &payload).await {
            Ok(_) => Ok(()),
            // Re-rendering identical text is not a failure.
            Err(DeliveryError::Api { detail })
                if detail.to_ascii_lowercase().contains("message is not modified") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_status(&self, status: &StatusMessage) -> Result<(), DeliveryError> {
        match self.delete_message(status.chat_id, status.message_id).await {
            Ok(()) => Ok(()),
            // Already gone is fine.
            Err(DeliveryError::EditTargetLost) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn send_media(
        &self,
        ctx: &RequestContext,
        files: &[MediaFile],
        caption: Option<&str>,
    ) -> Result<bool, DeliveryError> {
        // Files can disappear between fetch and send; skip them up front
        // rather than failing the whole delivery.
        let mut available: Vec<&MediaFile> = Vec::with_capacity(files.len());
        for file in files {
            match tokio::fs::metadata(&file.path).await {
                Ok(_) => available.push(file),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    error!(path = %file.path.display(), "media file missing before upload, skipping");
                }
                Err(e) => return Err(DeliveryError::api(e.to_string())),
            }
        }

        let mut images: Vec<&MediaFile> = available
            .iter()
            .copied()
            .filter(|f| f.kind == MediaKind::Image)
            .collect();
        images.sort_by_key(|f| extract_filename_index(&f.path));
        let videos: Vec<&MediaFile> = available
            .iter()
            .copied()
            .filter(|f| f.kind == MediaKind::Video)
            .collect();
        let audios: Vec<&MediaFile> = available
            .iter()
            .copied()
            .filter(|f| f.kind == MediaKind::Audio)
            .collect();

        let mut sent_something = false;
        let mut caption_used = false;

        if images.len() == 1 {
            self.send_photo(ctx.chat_id, &images[0].path, caption).await?;
            sent_something = true;
            caption_used = caption.is_some();
        } else if images.len() > 1 {
            for (i, chunk) in images.chunks(self.media_group_cap).enumerate() {
                let chunk_caption = if i == 0 { caption } else { None };
                if chunk.len() == 1 {
                    self.send_photo(ctx.chat_id, &chunk[0].path, chunk_caption)
                        .await?;
                } else {
                    self.send_photo_group(ctx.chat_id, chunk, chunk_caption)
                        .await?;
                }
                sent_something = true;
                if chunk_caption.is_some() {
                    caption_used = true;
                }
            }
        }

        // Only the first video and the first audio are sent; extra ones
        // are not expected from the downloaders.
        if let Some(video) = videos.first() {
            if videos.len() > 1 {
                warn!(count = videos.len(), "multiple videos fetched, sending the first");
            }
            let video_caption = if caption_used { None } else { caption };
            self.send_video(ctx.chat_id, &video.path, video_caption)
                .await?;
            sent_something = true;
            caption_used = caption_used || video_caption.is_some();
        }

        if let Some(audio) = audios.first() {
            let audio_caption = if caption_used { None } else { caption };
            self.send_audio(ctx.chat_id, &audio.path, audio_caption)
                .await?;
            sent_something = true;
        }

        Ok(sent_something)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_rejections_map_to_payload_too_large() {
        assert!(matches!(
            map_api_error(Some(413), "Request Entity Too Large"),
            DeliveryError::PayloadTooLarge
        ));
        assert!(matches!(
            map_api_error(Some(400), "Bad Request: file is too big"),
            DeliveryError::PayloadTooLarge
        ));
    }

    #[test]
    fn forbidden_maps_to_permission_denied() {
        assert!(matches!(
            map_api_error(Some(403), "Forbidden: bot was kicked from the group chat"),
            DeliveryError::PermissionDenied
        ));
    }

    #[test]
    fn lost_edit_targets_are_recognized() {
        assert!(matches!(
            map_api_error(Some(400), "Bad Request: message to edit not found"),
            DeliveryError::EditTargetLost
        ));
        assert!(matches!(
            map_api_error(Some(400), "Bad Request: message to delete not found"),
            DeliveryError::EditTargetLost
        ));
    }

    #[test]
    fn caption_parse_failures_are_recognized() {
        assert!(matches!(
            map_api_error(Some(400), "Bad Request: can't parse entities: unclosed tag"),
            DeliveryError::MalformedCaption
        ));
    }

    #[test]
    fn unknown_rejections_keep_their_description() {
        match map_api_error(Some(429), "Too Many Requests: retry after 5") {
            DeliveryError::Api { detail } => assert!(detail.contains("Too Many Requests")),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
