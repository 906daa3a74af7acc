// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Pipeline logic (filtering, batching, extraction) lives in domains::parsing
// and talks to the outside world through these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseChatSource)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::chats_config::ChatRef;

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a prompt with an LLM (returns raw text response)
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

// =============================================================================
// Chat Source Trait (Infrastructure - Telegram history access)
// =============================================================================

/// A message as read from a chat's history, before any filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub message_id: i64,
    /// Empty for media-only messages.
    pub text: String,
    pub date: DateTime<Utc>,
    pub sender_is_bot: bool,
}

#[async_trait]
pub trait BaseChatSource: Send + Sync {
    /// Messages posted at or after `since`, newest first.
    async fn fetch_messages(&self, chat: &ChatRef, since: DateTime<Utc>)
        -> Result<Vec<RawMessage>>;
}
