//! Telegram bot
//!
//! Serves stored freelance requests to users and admin commands to the
//! accounts listed in ADMIN_IDS.

use anyhow::{Context, Result};
use freelance_core::bot::{run_bot, BotState};
use freelance_core::chats_config::{load_chats_config, ConfigError};
use freelance_core::config::Config;
use freelance_core::domains::categories::Category;
use freelance_core::{db, telemetry};
use teloxide::Bot;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    tracing::info!("Starting freelance bot");

    let config = Config::from_env().context("Failed to load configuration")?;
    let pool = db::connect(&config.database_url, 10).await?;

    // Categories show up in the menu before the worker's first run.
    match load_chats_config(&config.chats_config_path) {
        Ok(chats) => {
            Category::sync_from_config(&chats, &pool).await?;
        }
        Err(ConfigError::NotFound(path)) => {
            tracing::warn!(path = %path.display(), "Chats config not found, using stored categories");
        }
        Err(e) => return Err(e).context("Failed to load chats config"),
    }

    if config.admin_ids.is_empty() {
        tracing::warn!("ADMIN_IDS is empty, admin commands are disabled");
    }

    let bot = Bot::new(config.bot_token()?);
    run_bot(bot, BotState::new(pool, config)).await
}
