// Freelance Feed - core library
//
// A worker reads configured Telegram chats through a userbot session,
// extracts freelance job postings with an LLM and stores them in Postgres.
// A separate bot process serves them to users page by page.

pub mod bot;
pub mod chats_config;
pub mod common;
pub mod config;
pub mod db;
pub mod domains;
pub mod kernel;
pub mod telemetry;

pub use self::config::*;
