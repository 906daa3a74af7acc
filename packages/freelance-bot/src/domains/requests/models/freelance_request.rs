use std::collections::HashSet;
use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::utils::{compute_hash, days_ago, truncate_chars};
use crate::common::{PageRequest, RequestId};

pub const DEFAULT_BUDGET: &str = "Не указан";

const TITLE_MAX: usize = 200;
const CATEGORY_MAX: usize = 50;
const BUDGET_MAX: usize = 100;
const CONTACT_MAX: usize = 500;
const SOURCE_CHAT_MAX: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Urgent => "urgent",
        }
    }

    /// Lenient parse: anything other than "urgent" is normal.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("urgent") {
            Urgency::Urgent
        } else {
            Urgency::Normal
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored freelance job posting.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FreelanceRequest {
    pub id: RequestId,
    pub category: String,
    pub title: String,
    pub description: String,
    pub budget: String,
    pub skills: Json<Vec<String>>,
    pub contact: Option<String>,
    pub urgency: String,
    pub source_chat: String,
    pub source_message_id: i64,
    pub message_date: DateTime<Utc>,
    pub message_text_hash: String,
    pub parsed_at: DateTime<Utc>,
    pub is_active: bool,
}

/// A request extracted by the analyzer, joined with its source message.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFreelanceRequest {
    pub category: String,
    pub title: String,
    pub description: String,
    pub budget: Option<String>,
    pub skills: Vec<String>,
    pub contact: Option<String>,
    pub urgency: Urgency,
    pub source_chat: String,
    pub source_message_id: i64,
    pub message_date: DateTime<Utc>,
    /// Original message text; its hash is the dedup key.
    pub source_text: String,
}

impl NewFreelanceRequest {
    pub fn text_hash(&self) -> String {
        compute_hash(&self.source_text)
    }

    fn budget_or_default(&self) -> String {
        match self.budget.as_deref().map(str::trim) {
            Some(budget) if !budget.is_empty() => truncate_chars(budget, BUDGET_MAX),
            _ => DEFAULT_BUDGET.to_string(),
        }
    }

    fn contact_or_none(&self) -> Option<String> {
        self.contact
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| truncate_chars(c, CONTACT_MAX))
    }
}

/// Read filter for the bot's paginated listing.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    /// `None` means every category.
    pub category: Option<String>,
    pub days: i64,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

// =============================================================================
// FreelanceRequest Queries
// =============================================================================

impl FreelanceRequest {
    pub fn urgency(&self) -> Urgency {
        Urgency::parse(&self.urgency)
    }

    pub fn is_urgent(&self) -> bool {
        self.urgency() == Urgency::Urgent
    }

    /// Insert new requests, skipping any whose source text hash is already
    /// stored. Returns the number of rows actually inserted.
    pub async fn save_many(requests: &[NewFreelanceRequest], pool: &PgPool) -> Result<u64> {
        if requests.is_empty() {
            return Ok(0);
        }

        let mut seen = HashSet::new();
        let mut tx = pool.begin().await?;
        let mut inserted = 0u64;

        for request in requests {
            let hash = request.text_hash();
            if !seen.insert(hash.clone()) {
                tracing::debug!(hash = %hash, "Skipping duplicate within batch");
                continue;
            }

            let result = sqlx::query(
                r#"
                INSERT INTO freelance_requests (
                    id, category, title, description, budget, skills, contact, urgency,
                    source_chat, source_message_id, message_date, message_text_hash
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (message_text_hash) DO NOTHING
                "#,
            )
            .bind(RequestId::new())
            .bind(truncate_chars(&request.category, CATEGORY_MAX))
            .bind(truncate_chars(request.title.trim(), TITLE_MAX))
            .bind(request.description.trim())
            .bind(request.budget_or_default())
            .bind(Json(&request.skills))
            .bind(request.contact_or_none())
            .bind(request.urgency.as_str())
            .bind(truncate_chars(&request.source_chat, SOURCE_CHAT_MAX))
            .bind(request.source_message_id)
            .bind(request.message_date)
            .bind(&hash)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        tracing::debug!(
            submitted = requests.len(),
            inserted = inserted,
            "Saved freelance requests"
        );
        Ok(inserted)
    }

    /// One page of active requests newer than `filter.days`, newest first,
    /// plus the total count of matching rows.
    ///
    /// Fails without querying when `filter.days` is out of range.
    pub async fn find_page(filter: &RequestFilter, pool: &PgPool) -> Result<(Vec<Self>, i64)> {
        let cutoff = days_ago(filter.days)
            .with_context(|| format!("Invalid period of {} days", filter.days))?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM freelance_requests
            WHERE is_active = TRUE
              AND message_date >= $1
              AND ($2::VARCHAR IS NULL OR category = $2)
            "#,
        )
        .bind(cutoff)
        .bind(filter.category.as_deref())
        .fetch_one(pool)
        .await?;

        let requests = sqlx::query_as::<_, Self>(
            r#"
            SELECT *
            FROM freelance_requests
            WHERE is_active = TRUE
              AND message_date >= $1
              AND ($2::VARCHAR IS NULL OR category = $2)
            ORDER BY message_date DESC, id DESC
            OFFSET $3
            LIMIT $4
            "#,
        )
        .bind(cutoff)
        .bind(filter.category.as_deref())
        .bind(filter.page.offset())
        .bind(filter.page.limit())
        .fetch_all(pool)
        .await?;

        Ok((requests, total))
    }

    /// Delete requests whose source message is older than `days`.
    ///
    /// A non-positive or absurd `days` is an error, never a cutoff in the
    /// future that would delete everything.
    pub async fn cleanup_older_than(days: i64, pool: &PgPool) -> Result<u64> {
        let cutoff = days_ago(days).with_context(|| format!("Invalid TTL of {} days", days))?;
        let result = sqlx::query("DELETE FROM freelance_requests WHERE message_date < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Active request counts per category, largest first.
    pub async fn stats_by_category(pool: &PgPool) -> Result<Vec<CategoryCount>> {
        sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS count
            FROM freelance_requests
            WHERE is_active = TRUE
            GROUP BY category
            ORDER BY count DESC, category
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_request(budget: Option<&str>, contact: Option<&str>) -> NewFreelanceRequest {
        NewFreelanceRequest {
            category: "web_dev".into(),
            title: "Landing page".into(),
            description: "Need a landing page".into(),
            budget: budget.map(Into::into),
            skills: vec!["HTML".into()],
            contact: contact.map(Into::into),
            urgency: Urgency::Normal,
            source_chat: "@freelance".into(),
            source_message_id: 1,
            message_date: Utc::now(),
            source_text: "Need a landing page, budget 10k".into(),
        }
    }

    #[test]
    fn urgency_parse_is_lenient() {
        assert_eq!(Urgency::parse("urgent"), Urgency::Urgent);
        assert_eq!(Urgency::parse(" URGENT "), Urgency::Urgent);
        assert_eq!(Urgency::parse("normal"), Urgency::Normal);
        assert_eq!(Urgency::parse("asap"), Urgency::Normal);
        assert_eq!(Urgency::parse(""), Urgency::Normal);
    }

    #[test]
    fn blank_budget_falls_back_to_default() {
        assert_eq!(new_request(None, None).budget_or_default(), DEFAULT_BUDGET);
        assert_eq!(new_request(Some("  "), None).budget_or_default(), DEFAULT_BUDGET);
        assert_eq!(new_request(Some("50 000 ₽"), None).budget_or_default(), "50 000 ₽");
    }

    #[test]
    fn blank_contact_is_none() {
        assert_eq!(new_request(None, Some("")).contact_or_none(), None);
        assert_eq!(
            new_request(None, Some(" @client ")).contact_or_none(),
            Some("@client".to_string())
        );
    }

    #[test]
    fn hash_uses_source_text() {
        let request = new_request(None, None);
        assert_eq!(request.text_hash(), compute_hash("Need a landing page, budget 10k"));
    }
}
