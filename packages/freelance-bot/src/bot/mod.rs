//! Telegram Bot API front-end: category browsing and admin commands.

pub mod callbacks;
pub mod format;
pub mod handlers;
pub mod keyboards;

pub use callbacks::{CallbackData, CallbackParseError, CategorySelection};
pub use handlers::{run_bot, schema, BotState, Command};
