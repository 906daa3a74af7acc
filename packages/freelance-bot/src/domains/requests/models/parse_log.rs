use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::ParseLogId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Running,
    Success,
    Failed,
}

impl ParseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStatus::Running => "running",
            ParseStatus::Success => "success",
            ParseStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParseStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(ParseStatus::Running),
            "success" => Ok(ParseStatus::Success),
            "failed" => Ok(ParseStatus::Failed),
            other => Err(anyhow::anyhow!("Unknown parse status: {}", other)),
        }
    }
}

/// One run of the parse pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParseLog {
    pub id: ParseLogId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: String,
    pub chats_parsed: i32,
    pub messages_found: i32,
    pub requests_extracted: i32,
    pub error_message: Option<String>,
}

/// Counters and final state written when a run ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub chats_parsed: i32,
    pub messages_found: i32,
    pub requests_extracted: i32,
    pub error_message: Option<String>,
}

impl ParseSummary {
    pub fn status(&self) -> ParseStatus {
        if self.error_message.is_some() {
            ParseStatus::Failed
        } else {
            ParseStatus::Success
        }
    }
}

// =============================================================================
// ParseLog Queries
// =============================================================================

impl ParseLog {
    pub fn status(&self) -> Option<ParseStatus> {
        self.status.parse().ok()
    }

    pub async fn start(pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO parse_logs (id, status)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(ParseLogId::new())
        .bind(ParseStatus::Running.as_str())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Close a run as `success`, or `failed` when the summary carries an error.
    pub async fn finish(id: ParseLogId, summary: &ParseSummary, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE parse_logs
            SET finished_at = NOW(),
                status = $2,
                chats_parsed = $3,
                messages_found = $4,
                requests_extracted = $5,
                error_message = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(summary.status().as_str())
        .bind(summary.chats_parsed)
        .bind(summary.messages_found)
        .bind(summary.requests_extracted)
        .bind(summary.error_message.as_deref())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Most recently started run, if any.
    pub async fn latest(pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM parse_logs ORDER BY started_at DESC, id DESC LIMIT 1")
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [ParseStatus::Running, ParseStatus::Success, ParseStatus::Failed] {
            assert_eq!(status.as_str().parse::<ParseStatus>().unwrap(), status);
        }
        assert!("done".parse::<ParseStatus>().is_err());
    }

    #[test]
    fn summary_status_follows_error() {
        let ok = ParseSummary {
            chats_parsed: 3,
            ..Default::default()
        };
        assert_eq!(ok.status(), ParseStatus::Success);

        let failed = ParseSummary {
            error_message: Some("boom".into()),
            ..Default::default()
        };
        assert_eq!(failed.status(), ParseStatus::Failed);
    }
}
