//! Update dispatch: routes incoming messages into pipeline runs.

use std::sync::Arc;

use tracing::{debug, info, warn};

use reelgrab_core::delivery::escape_html;
use reelgrab_core::links::{extract_supported_link, looks_like_link_attempt};
use reelgrab_core::{LinkPipeline, Messenger, RequestContext};

use crate::telegram::TelegramClient;
use crate::types::{Message, Update, User};

const UNSUPPORTED_LINK_REPLY: &str = "Sorry, I couldn't recognize a supported link \
(Instagram, TikTok, YT Shorts) in your message. Please send the link directly.";

pub struct UpdateDispatcher {
    pipeline: Arc<LinkPipeline>,
    client: Arc<TelegramClient>,
    target_group_id: Option<i64>,
}

impl UpdateDispatcher {
    pub fn new(
        pipeline: Arc<LinkPipeline>,
        client: Arc<TelegramClient>,
        target_group_id: Option<i64>,
    ) -> Self {
        Self {
            pipeline,
            client,
            target_group_id,
        }
    }

    pub async fn dispatch(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        if message.chat.is_group() {
            self.handle_group_message(message).await;
        } else if message.chat.is_private() {
            self.handle_private_message(message).await;
        }
    }

    async fn handle_group_message(&self, message: Message) {
        let chat_id = message.chat.id;
        if let Some(target) = self.target_group_id {
            if chat_id != target {
                return;
            }
        }
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some((url, extra_text)) = extract_supported_link(text) else {
            return;
        };

        let presenter = message.from.as_ref().map(user_mention);
        info!(chat_id, url, "supported link in group message");

        // The relayed media replaces the original link post.
        if let Err(e) = self.client.delete_message(chat_id, message.message_id).await {
            warn!(chat_id, message_id = message.message_id, error = %e,
                "could not delete original message");
        }

        let ctx = RequestContext {
            chat_id,
            presenter,
            extra_text,
            reply_to: None,
        };
        self.spawn_run(ctx, url);
    }

    async fn handle_private_message(&self, message: Message) {
        let chat_id = message.chat.id;
        let Some(text) = message.text.as_deref() else {
            return;
        };

        let Some((url, _)) = extract_supported_link(text) else {
            if looks_like_link_attempt(text) {
                debug!(chat_id, "unsupported link attempt in private chat");
                if let Err(e) = self
                    .client
                    .send_status(chat_id, UNSUPPORTED_LINK_REPLY, Some(message.message_id))
                    .await
                {
                    warn!(chat_id, error = %e, "could not send unsupported-link reply");
                }
            }
            return;
        };

        info!(chat_id, url, "supported link in private chat");
        let ctx = RequestContext {
            chat_id,
            presenter: None,
            extra_text: None,
            reply_to: Some(message.message_id),
        };
        self.spawn_run(ctx, url);
    }

    /// Each link runs as its own task so a slow download does not stall
    /// the polling loop.
    fn spawn_run(&self, ctx: RequestContext, url: String) {
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            pipeline.run(ctx, &url).await;
        });
    }
}

/// HTML mention for the user who posted the link. Prefers the first
/// name, then the username, then the numeric id.
pub fn user_mention(user: &User) -> String {
    let display = if !user.first_name.is_empty() {
        escape_html(&user.first_name)
    } else if let Some(username) = &user.username {
        format!("@{username}")
    } else {
        format!("User (ID: {})", user.id)
    };
    format!("<b>{display}</b>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first_name: &str, username: Option<&str>) -> User {
        User {
            id: 77,
            first_name: first_name.to_string(),
            username: username.map(str::to_string),
        }
    }

    #[test]
    fn mention_prefers_first_name_escaped() {
        let mention = user_mention(&user("Ann <3", Some("ann")));
        assert_eq!(mention, "<b>Ann &lt;3</b>");
    }

    #[test]
    fn mention_falls_back_to_username() {
        let mention = user_mention(&user("", Some("ann")));
        assert_eq!(mention, "<b>@ann</b>");
    }

    #[test]
    fn mention_falls_back_to_id() {
        let mention = user_mention(&user("", None));
        assert_eq!(mention, "<b>User (ID: 77)</b>");
    }
}
