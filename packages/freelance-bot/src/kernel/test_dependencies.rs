// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{BaseAI, BaseChatSource, RawMessage, ServerDeps};
use crate::chats_config::ChatRef;
use crate::config::ParserSettings;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Mock AI
// =============================================================================

/// Queued LLM replies; every prompt is recorded.
pub struct MockAI {
    responses: Arc<Mutex<Vec<Result<String, String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: &str) -> Self {
        lock(&self.responses).push(Ok(response.to_string()));
        self
    }

    pub fn with_error(self, error: &str) -> Self {
        lock(&self.responses).push(Err(error.to_string()));
        self
    }

    /// User prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        lock(&self.prompts).push(user.to_string());

        let mut responses = lock(&self.responses);
        if responses.is_empty() {
            return Ok("[]".to_string());
        }
        responses.remove(0).map_err(|e| anyhow::anyhow!(e))
    }
}

// =============================================================================
// Mock Chat Source
// =============================================================================

/// Canned history per chat. Chats without an entry return no messages.
pub struct MockChatSource {
    messages: Arc<Mutex<HashMap<ChatRef, Vec<RawMessage>>>>,
    failures: Arc<Mutex<HashMap<ChatRef, String>>>,
    calls: Arc<Mutex<Vec<(ChatRef, DateTime<Utc>)>>>,
}

impl MockChatSource {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_messages(self, chat: ChatRef, messages: Vec<RawMessage>) -> Self {
        lock(&self.messages).insert(chat, messages);
        self
    }

    /// Make reads of `chat` fail with `error`.
    pub fn with_failure(self, chat: ChatRef, error: &str) -> Self {
        lock(&self.failures).insert(chat, error.to_string());
        self
    }

    pub fn requested_chats(&self) -> Vec<ChatRef> {
        lock(&self.calls).iter().map(|(chat, _)| chat.clone()).collect()
    }

    pub fn was_requested(&self, chat: &ChatRef) -> bool {
        lock(&self.calls).iter().any(|(c, _)| c == chat)
    }
}

impl Default for MockChatSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseChatSource for MockChatSource {
    async fn fetch_messages(
        &self,
        chat: &ChatRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawMessage>> {
        lock(&self.calls).push((chat.clone(), since));

        if let Some(error) = lock(&self.failures).get(chat) {
            return Err(anyhow::anyhow!("{}", error));
        }

        Ok(lock(&self.messages).get(chat).cloned().unwrap_or_default())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Builder for `ServerDeps` wired to mocks.
pub struct TestDependencies {
    pub ai: Arc<MockAI>,
    pub chat_source: Arc<MockChatSource>,
    pub settings: ParserSettings,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            ai: Arc::new(MockAI::new()),
            chat_source: Arc::new(MockChatSource::new()),
            settings: ParserSettings {
                request_delay: std::time::Duration::ZERO,
                ..ParserSettings::default()
            },
        }
    }

    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    pub fn mock_chat_source(mut self, source: MockChatSource) -> Self {
        self.chat_source = Arc::new(source);
        self
    }

    pub fn settings(mut self, settings: ParserSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn into_server_deps(
        &self,
        db_pool: PgPool,
        chats_config_path: impl Into<std::path::PathBuf>,
    ) -> ServerDeps {
        ServerDeps::new(
            db_pool,
            self.ai.clone(),
            self.chat_source.clone(),
            self.settings.clone(),
            chats_config_path.into(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
