//! Serde models for the slice of the Telegram Bot API this bot uses.

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }

    pub fn is_group(&self) -> bool {
        self.kind == "group" || self.kind == "supergroup"
    }
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

/// One item of a `sendMediaGroup` payload. The `media` field holds an
/// `attach://<name>` reference to a multipart file part.
#[derive(Debug, Serialize)]
pub struct InputMediaPhoto {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub media: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
}

impl InputMediaPhoto {
    pub fn new(attach_name: &str, caption: Option<String>) -> Self {
        let parse_mode = caption.as_ref().map(|_| "HTML");
        Self {
            kind: "photo",
            media: format!("attach://{attach_name}"),
            caption,
            parse_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_update() {
        let raw = r#"{
            "update_id": 7001,
            "message": {
                "message_id": 42,
                "chat": {"id": -100123, "type": "supergroup", "title": "memes"},
                "from": {"id": 9, "first_name": "Ann", "username": "ann"},
                "text": "https://www.tiktok.com/@x/video/1"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 7001);
        let message = update.message.unwrap();
        assert!(message.chat.is_group());
        assert!(!message.chat.is_private());
        assert_eq!(message.from.unwrap().username.as_deref(), Some("ann"));
    }

    #[test]
    fn tolerates_non_text_messages() {
        let raw = r#"{
            "update_id": 7002,
            "message": {
                "message_id": 43,
                "chat": {"id": 5, "type": "private"}
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let message = update.message.unwrap();
        assert!(message.text.is_none());
        assert!(message.from.is_none());
    }

    #[test]
    fn media_group_item_references_attached_part() {
        let item = InputMediaPhoto::new("file0", Some("Sent by <b>Ann</b>".to_string()));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "photo");
        assert_eq!(json["media"], "attach://file0");
        assert_eq!(json["parse_mode"], "HTML");

        let bare = InputMediaPhoto::new("file1", None);
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("caption").is_none());
        assert!(json.get("parse_mode").is_none());
    }
}
