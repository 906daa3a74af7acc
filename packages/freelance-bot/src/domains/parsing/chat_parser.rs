use std::sync::Arc;
use std::time::Duration;

use super::message::{filter_messages, ChatMessage};
use crate::chats_config::ChatRef;
use crate::common::utils::days_ago;
use crate::kernel::BaseChatSource;

/// Reads recent history from configured chats.
pub struct ChatParser {
    source: Arc<dyn BaseChatSource>,
    request_delay: Duration,
}

impl ChatParser {
    pub fn new(source: Arc<dyn BaseChatSource>, request_delay: Duration) -> Self {
        Self {
            source,
            request_delay,
        }
    }

    /// Filtered text messages from the last `days` days, newest first.
    ///
    /// A chat that cannot be read yields an empty list; the error is logged.
    /// So does an out-of-range `days`.
    pub async fn parse_chat(&self, chat: &ChatRef, days: i64) -> Vec<ChatMessage> {
        let Some(since) = days_ago(days) else {
            tracing::error!(chat = %chat, days = days, "Invalid look-back period");
            return Vec::new();
        };

        let raw = match self.source.fetch_messages(chat, since).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(chat = %chat, error = %e, "Failed to read chat");
                return Vec::new();
            }
        };

        let chat_id = chat.to_string();
        let messages: Vec<ChatMessage> = raw
            .into_iter()
            .filter(|m| m.date >= since && !m.text.trim().is_empty())
            .map(|m| ChatMessage::from_raw(m, chat_id.as_str()))
            .collect();
        let fetched = messages.len();

        let filtered = filter_messages(messages);
        tracing::info!(
            chat = %chat,
            fetched = fetched,
            kept = filtered.len(),
            "Parsed chat"
        );
        filtered
    }

    /// Parse every chat of a category in order, pausing between chats.
    pub async fn parse_category(
        &self,
        slug: &str,
        chats: &[ChatRef],
        days: i64,
    ) -> Vec<ChatMessage> {
        let mut all = Vec::new();

        for (i, chat) in chats.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let mut messages = self.parse_chat(chat, days).await;
            for message in &mut messages {
                message.category = slug.to_string();
            }
            all.extend(messages);
        }

        tracing::info!(
            category = %slug,
            chats = chats.len(),
            messages = all.len(),
            "Parsed category"
        );
        all
    }
}
