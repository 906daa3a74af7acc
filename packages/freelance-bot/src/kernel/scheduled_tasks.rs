//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (every PARSE_INTERVAL_HOURS)
//!     │
//!     └─► run_parse_job()
//!             └─► chats → LLM → freelance_requests → TTL cleanup
//! ```
//!
//! Manual runs requested from the bot arrive through `kernel::trigger` and
//! share the same run guard, so a scheduled tick during a manual run is
//! skipped rather than queued.

use std::time::Duration;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::ServerDeps;
use crate::domains::parsing::{run_parse_job, ParseJobOutcome};

/// Start the periodic parse job.
pub async fn start_scheduler(deps: ServerDeps) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let interval = Duration::from_secs(deps.settings.parse_interval_hours * 60 * 60);
    let parse_deps = deps.clone();
    let parse_job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let deps = parse_deps.clone();
        Box::pin(async move {
            run_and_log(&deps, "scheduled").await;
        })
    })?;

    scheduler.add(parse_job).await?;
    scheduler.start().await?;

    tracing::info!(
        interval_hours = deps.settings.parse_interval_hours,
        "Scheduled tasks started (periodic parsing)"
    );
    Ok(scheduler)
}

/// Run the parse job, logging instead of returning failures.
pub async fn run_and_log(deps: &ServerDeps, trigger: &str) {
    match run_parse_job(deps).await {
        Ok(ParseJobOutcome::Completed { report, .. }) => {
            tracing::info!(
                trigger = %trigger,
                saved = report.requests_saved,
                "Parse run finished"
            );
        }
        Ok(ParseJobOutcome::Failed { error, .. }) => {
            tracing::error!(trigger = %trigger, error = %error, "Parse run failed");
        }
        Ok(ParseJobOutcome::AlreadyRunning) => {
            tracing::info!(trigger = %trigger, "Parse run skipped, another run is in progress");
        }
        Err(e) => {
            tracing::error!(trigger = %trigger, error = %e, "Parse run could not be recorded");
        }
    }
}
