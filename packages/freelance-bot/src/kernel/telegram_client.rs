//! MTProto userbot access to chat history via `grammers`.
//!
//! The Bot API cannot read arbitrary public chats, so the worker reads them
//! as a regular user account. The session file is created once by the
//! `userbot_login` binary and reused afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grammers_client::types::{Chat, PackedChat};
use grammers_client::{Client, Config as ClientConfig, InitParams};
use grammers_session::Session;
use tokio::sync::Mutex;

use super::{BaseChatSource, RawMessage};
use crate::chats_config::ChatRef;
use crate::config::TelegramApi;

/// Offset Telegram adds to channel ids in the Bot API "-100…" form.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Connect with the session stored at `session_file`, creating an empty
/// session if the file does not exist yet.
pub async fn connect_client(api: &TelegramApi<'_>, session_file: &Path) -> Result<Client> {
    let session = Session::load_file_or_create(session_file)
        .with_context(|| format!("Failed to open session file {}", session_file.display()))?;

    Client::connect(ClientConfig {
        session,
        api_id: api.api_id,
        api_hash: api.api_hash.to_string(),
        params: InitParams {
            catch_up: false,
            ..Default::default()
        },
    })
    .await
    .context("Failed to connect to Telegram")
}

/// Map a configured numeric chat id to the bare id MTProto uses.
///
/// `-1001234567890` (channel/supergroup) → `1234567890`, `-42` (basic
/// group) → `42`, positive ids are users and stay as they are.
pub fn bare_chat_id(id: i64) -> i64 {
    if id <= -CHANNEL_ID_OFFSET {
        -id - CHANNEL_ID_OFFSET
    } else {
        id.abs()
    }
}

/// `BaseChatSource` backed by an authorized userbot session.
pub struct GrammersChatSource {
    client: Client,
    session_file: PathBuf,
    resolved: Mutex<HashMap<ChatRef, PackedChat>>,
}

impl GrammersChatSource {
    /// Connect and verify the session is authorized.
    pub async fn connect(api: &TelegramApi<'_>, session_file: impl Into<PathBuf>) -> Result<Self> {
        let session_file = session_file.into();
        let client = connect_client(api, &session_file).await?;

        if !client
            .is_authorized()
            .await
            .context("Failed to check userbot authorization")?
        {
            bail!(
                "Userbot session {} is not authorized; run `userbot_login` first",
                session_file.display()
            );
        }

        tracing::info!(session = %session_file.display(), "Userbot connected");
        Ok(Self {
            client,
            session_file,
            resolved: Mutex::new(HashMap::new()),
        })
    }

    /// Persist updated session state (auth keys, cached peers).
    pub fn save_session(&self) -> Result<()> {
        self.client
            .session()
            .save_to_file(&self.session_file)
            .with_context(|| format!("Failed to save session {}", self.session_file.display()))
    }

    async fn resolve(&self, chat: &ChatRef) -> Result<PackedChat> {
        if let Some(packed) = self.resolved.lock().await.get(chat) {
            return Ok(*packed);
        }

        let found = match chat {
            ChatRef::Username(name) => self
                .client
                .resolve_username(name)
                .await
                .with_context(|| format!("Failed to resolve @{}", name))?,
            ChatRef::Id(id) => self.find_in_dialogs(*id).await?,
        };

        let packed = found
            .map(|c| c.pack())
            .ok_or_else(|| anyhow!("Chat {} not found", chat))?;
        self.resolved.lock().await.insert(chat.clone(), packed);
        Ok(packed)
    }

    /// Numeric ids can only be resolved through chats the account has joined.
    async fn find_in_dialogs(&self, id: i64) -> Result<Option<Chat>> {
        let bare = bare_chat_id(id);
        let mut dialogs = self.client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.context("Failed to list dialogs")? {
            let chat = dialog.chat();
            if chat.id() == bare {
                return Ok(Some(chat.clone()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BaseChatSource for GrammersChatSource {
    async fn fetch_messages(
        &self,
        chat: &ChatRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawMessage>> {
        let packed = self.resolve(chat).await?;

        let mut messages = Vec::new();
        let mut history = self.client.iter_messages(packed);
        while let Some(message) = history
            .next()
            .await
            .with_context(|| format!("Failed to read history of {}", chat))?
        {
            if message.date() < since {
                break;
            }

            let sender_is_bot = matches!(message.sender(), Some(Chat::User(user)) if user.is_bot());
            messages.push(RawMessage {
                message_id: i64::from(message.id()),
                text: message.text().to_string(),
                date: message.date(),
                sender_is_bot,
            });
        }

        tracing::debug!(chat = %chat, count = messages.len(), "Fetched chat history");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ids_drop_the_prefix() {
        assert_eq!(bare_chat_id(-1001234567890), 1234567890);
        assert_eq!(bare_chat_id(-1000000000001), 1);
    }

    #[test]
    fn group_and_user_ids() {
        assert_eq!(bare_chat_id(-4242), 4242);
        assert_eq!(bare_chat_id(777), 777);
    }
}
