//! One full parse run: chats → LLM → storage → TTL cleanup.

use anyhow::{Context, Result};

use super::analyzer::Analyzer;
use super::chat_parser::ChatParser;
use crate::chats_config::load_chats_config;
use crate::common::ParseLogId;
use crate::domains::categories::Category;
use crate::domains::requests::{FreelanceRequest, ParseLog, ParseSummary};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub categories: usize,
    pub chats_parsed: usize,
    pub messages_found: usize,
    pub requests_extracted: usize,
    pub requests_saved: u64,
    pub requests_cleaned_up: u64,
}

impl ParseReport {
    fn summary(&self, error_message: Option<String>) -> ParseSummary {
        ParseSummary {
            chats_parsed: saturating_i32(self.chats_parsed),
            messages_found: saturating_i32(self.messages_found),
            requests_extracted: saturating_i32(self.requests_extracted),
            error_message,
        }
    }
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseJobOutcome {
    Completed {
        log_id: ParseLogId,
        report: ParseReport,
    },
    /// The run started but a job-level step failed; the log records why.
    Failed {
        log_id: ParseLogId,
        report: ParseReport,
        error: String,
    },
    /// Another run in this process holds the guard.
    AlreadyRunning,
}

/// Run the pipeline once and record it in `parse_logs`.
///
/// Per-chat and per-batch failures are logged and skipped. Failures of the
/// run itself (config file, database) mark the log `failed`. `Err` is only
/// returned when the parse log itself cannot be written.
pub async fn run_parse_job(deps: &ServerDeps) -> Result<ParseJobOutcome> {
    let Some(_guard) = deps.run_guard.try_acquire() else {
        tracing::warn!("Parse job already running, skipping");
        return Ok(ParseJobOutcome::AlreadyRunning);
    };

    let log = ParseLog::start(&deps.db_pool)
        .await
        .context("Failed to create parse log")?;
    tracing::info!(log_id = %log.id, "Parse job started");

    let mut report = ParseReport::default();
    let result = run_pipeline(deps, &mut report).await;

    let outcome = match result {
        Ok(()) => {
            ParseLog::finish(log.id, &report.summary(None), &deps.db_pool)
                .await
                .context("Failed to finish parse log")?;
            tracing::info!(
                log_id = %log.id,
                chats = report.chats_parsed,
                messages = report.messages_found,
                extracted = report.requests_extracted,
                saved = report.requests_saved,
                cleaned_up = report.requests_cleaned_up,
                "Parse job completed"
            );
            ParseJobOutcome::Completed {
                log_id: log.id,
                report,
            }
        }
        Err(e) => {
            let error = format!("{:#}", e);
            tracing::error!(log_id = %log.id, error = %error, "Parse job failed");
            ParseLog::finish(log.id, &report.summary(Some(error.clone())), &deps.db_pool)
                .await
                .context("Failed to finish parse log")?;
            ParseJobOutcome::Failed {
                log_id: log.id,
                report,
                error,
            }
        }
    };

    Ok(outcome)
}

async fn run_pipeline(deps: &ServerDeps, report: &mut ParseReport) -> Result<()> {
    let pool = &deps.db_pool;
    let config = load_chats_config(&deps.chats_config_path).context("Failed to load chats config")?;
    tracing::info!(
        categories = config.categories.len(),
        chats = config.total_chats(),
        parse_days = config.parse_days,
        "Loaded chats config"
    );
    Category::sync_from_config(&config, pool)
        .await
        .context("Failed to sync categories")?;

    let parser = ChatParser::new(deps.chat_source.clone(), deps.settings.request_delay);
    let analyzer = Analyzer::new(deps.ai.clone(), deps.settings.batch_size);

    for category in &config.categories {
        report.categories += 1;
        if category.chats.is_empty() {
            tracing::warn!(category = %category.slug, "Category has no chats");
            continue;
        }

        let messages = parser
            .parse_category(&category.slug, &category.chats, config.parse_days)
            .await;
        report.chats_parsed += category.chats.len();
        report.messages_found += messages.len();

        if !messages.is_empty() {
            let requests = analyzer.analyze_all(&messages).await;
            report.requests_extracted += requests.len();

            match FreelanceRequest::save_many(&requests, pool).await {
                Ok(saved) => {
                    report.requests_saved += saved;
                    tracing::info!(
                        category = %category.slug,
                        extracted = requests.len(),
                        saved = saved,
                        "Saved category requests"
                    );
                }
                Err(e) => {
                    tracing::error!(category = %category.slug, error = %e, "Failed to save requests");
                    continue;
                }
            }
        }

        if let Err(e) = Category::touch_last_parsed(&category.slug, pool).await {
            tracing::warn!(category = %category.slug, error = %e, "Failed to update last_parsed_at");
        }
    }

    report.requests_cleaned_up =
        FreelanceRequest::cleanup_older_than(deps.settings.messages_ttl_days, pool)
            .await
            .context("Failed to clean up old requests")?;
    if report.requests_cleaned_up > 0 {
        tracing::info!(deleted = report.requests_cleaned_up, "Removed expired requests");
    }

    Ok(())
}
