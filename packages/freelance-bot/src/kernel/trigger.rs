//! Cross-process manual trigger over Postgres LISTEN/NOTIFY.
//!
//! The bot and the worker are separate processes that share only the
//! database, so `/parse` sends a notification and the worker listens.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::time::{timeout, Instant};

use super::scheduled_tasks::run_and_log;
use super::ServerDeps;

pub const PARSE_CHANNEL: &str = "parse_requested";

/// How long to wait for further queued notifications after a run.
const DRAIN_WINDOW: Duration = Duration::from_millis(100);

const RESTART_DELAY_MIN: Duration = Duration::from_secs(1);
const RESTART_DELAY_MAX: Duration = Duration::from_secs(60);

/// Ask the worker to start a parse run. Returns as soon as the
/// notification is sent; the bot does not wait for the run.
pub async fn request_parse(requested_by: i64, pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(PARSE_CHANNEL)
        .bind(requested_by.to_string())
        .execute(pool)
        .await
        .context("Failed to send parse notification")?;

    tracing::info!(requested_by = requested_by, "Manual parse requested");
    Ok(())
}

/// Run the parse job for each burst of notifications until the connection
/// fails.
///
/// Runs are awaited inline. Requests that queued up during a run are
/// drained afterwards and served by a single follow-up run, and the run
/// guard still rejects overlap with scheduled runs.
pub async fn listen_for_parse_requests(deps: ServerDeps) -> Result<()> {
    let mut listener = PgListener::connect_with(&deps.db_pool)
        .await
        .context("Failed to open notification listener")?;
    listener
        .listen(PARSE_CHANNEL)
        .await
        .context("Failed to LISTEN for parse requests")?;

    tracing::info!(channel = PARSE_CHANNEL, "Listening for manual parse requests");

    loop {
        let notification = listener
            .recv()
            .await
            .context("Notification listener failed")?;
        tracing::info!(
            requested_by = notification.payload(),
            "Received manual parse request"
        );
        run_and_log(&deps, "manual").await;

        let coalesced = drain_pending(&mut listener).await;
        if coalesced > 0 {
            tracing::info!(
                coalesced = coalesced,
                "Parse requests queued during the run, starting one more"
            );
            run_and_log(&deps, "manual").await;
            drain_pending(&mut listener).await;
        }
    }
}

/// Consume notifications that are already queued on the listener and
/// return how many there were.
///
/// Stops at the first quiet `DRAIN_WINDOW` or on a connection error, which
/// the next `recv` reports.
pub async fn drain_pending(listener: &mut PgListener) -> usize {
    let mut drained = 0;
    while let Ok(Ok(_)) = timeout(DRAIN_WINDOW, listener.recv()).await {
        drained += 1;
    }
    drained
}

/// Keep the parse request listener alive for the life of the worker,
/// reconnecting with exponential backoff whenever it fails.
pub async fn supervise_parse_listener(deps: ServerDeps) {
    restart_with_backoff(
        "parse request listener",
        || listen_for_parse_requests(deps.clone()),
        RESTART_DELAY_MIN,
        RESTART_DELAY_MAX,
    )
    .await
}

/// Run `task` forever, sleeping between attempts.
///
/// The delay doubles after each failure up to `max_delay` and resets once
/// an attempt has stayed up for at least `max_delay`.
async fn restart_with_backoff<F, Fut>(
    name: &str,
    mut task: F,
    min_delay: Duration,
    max_delay: Duration,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut delay = min_delay;
    loop {
        let started = Instant::now();
        let result = task().await;
        if started.elapsed() >= max_delay {
            delay = min_delay;
        }

        match result {
            Ok(()) => tracing::warn!(
                task = name,
                delay_secs = delay.as_secs(),
                "Task stopped, restarting"
            ),
            Err(e) => tracing::error!(
                task = name,
                error = %e,
                delay_secs = delay.as_secs(),
                "Task failed, restarting"
            ),
        }

        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(max_delay);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::anyhow;

    use super::*;

    fn counting_task(
        attempts: &Arc<AtomicUsize>,
        runs_for: Duration,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        let attempts = attempts.clone();
        move || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(runs_for).await;
                Err(anyhow!("connection reset"))
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_task_is_restarted_with_growing_delay() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let task = counting_task(&attempts, Duration::ZERO);

        // Attempts at 0s, 1s, 3s and 7s; the next would be at 11s.
        let supervised = restart_with_backoff(
            "flaky",
            task,
            Duration::from_secs(1),
            Duration::from_secs(4),
        );
        assert!(timeout(Duration::from_secs(10), supervised).await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn long_lived_attempt_resets_the_delay() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let task = counting_task(&attempts, Duration::from_secs(5));

        // Each attempt outlives the max delay, so every restart waits 1s:
        // attempts start at 0s, 6s and 12s.
        let supervised = restart_with_backoff(
            "long lived",
            task,
            Duration::from_secs(1),
            Duration::from_secs(4),
        );
        assert!(timeout(Duration::from_millis(12_500), supervised).await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
