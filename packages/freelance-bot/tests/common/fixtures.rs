//! Test fixtures for creating test data.
//!
//! These fixtures build domain inputs and use the model methods directly to
//! store them.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, Utc};
use freelance_core::domains::requests::{FreelanceRequest, NewFreelanceRequest, Urgency};
use freelance_core::kernel::RawMessage;
use sqlx::PgPool;
use tempfile::TempDir;

/// A request in `category` whose source message is `days_ago` old.
pub fn new_request(category: &str, source_text: &str, days_ago: i64) -> NewFreelanceRequest {
    NewFreelanceRequest {
        category: category.to_string(),
        title: format!("Job: {}", source_text.chars().take(30).collect::<String>()),
        description: source_text.to_string(),
        budget: None,
        skills: vec!["Rust".to_string()],
        contact: Some("@client".to_string()),
        urgency: Urgency::Normal,
        source_chat: "@freelance_jobs".to_string(),
        source_message_id: 1,
        message_date: Utc::now() - Duration::days(days_ago) - Duration::minutes(1),
        source_text: source_text.to_string(),
    }
}

/// Store `count` distinct requests in `category`, one hour apart, newest first.
pub async fn seed_requests(pool: &PgPool, category: &str, count: usize) -> Result<u64> {
    let requests: Vec<_> = (0..count)
        .map(|i| {
            let mut request = new_request(category, &format!("{} posting number {}", category, i), 0);
            request.message_date = Utc::now() - Duration::hours(i as i64 + 1);
            request.source_message_id = i as i64;
            request
        })
        .collect();
    FreelanceRequest::save_many(&requests, pool).await
}

/// A history message at least 50 characters long.
pub fn job_message(id: i64, text: &str, minutes_ago: i64) -> RawMessage {
    RawMessage {
        message_id: id,
        text: format!("{}: ищем исполнителя, оплата по договорённости, пишите в личку", text),
        date: Utc::now() - Duration::minutes(minutes_ago),
        sender_is_bot: false,
    }
}

/// Write a chats config into a temp dir and return its path.
pub fn write_chats_config(yaml: &str) -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("chats.yaml");
    std::fs::write(&path, yaml)?;
    Ok((dir, path))
}
