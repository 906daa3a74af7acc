//! Parse worker
//!
//! Runs the parse pipeline at startup, then every PARSE_INTERVAL_HOURS, and
//! whenever an admin sends /parse to the bot.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use freelance_core::config::Config;
use freelance_core::domains::parsing::{run_parse_job, ParseJobOutcome};
use freelance_core::kernel::scheduled_tasks::{run_and_log, start_scheduler};
use freelance_core::kernel::trigger::supervise_parse_listener;
use freelance_core::kernel::{GrammersChatSource, OpenAiCompatible, ServerDeps};
use freelance_core::{db, telemetry};

#[derive(Parser, Debug)]
#[command(name = "worker", about = "Telegram freelance request parser")]
struct Args {
    /// Run one parse and exit.
    #[arg(long)]
    once: bool,

    /// Do not parse at startup; wait for the first scheduled tick.
    #[arg(long)]
    skip_initial_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing();

    tracing::info!("Starting parse worker");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        interval_hours = config.parser.parse_interval_hours,
        ttl_days = config.parser.messages_ttl_days,
        batch_size = config.parser.batch_size,
        chats_config = %config.chats_config_path.display(),
        "Worker settings"
    );

    let pool = db::connect(&config.database_url, 5).await?;

    let ai = Arc::new(OpenAiCompatible::from_config(&config)?);
    tracing::info!(model = %ai.model(), "LLM client ready");

    let chat_source = Arc::new(
        GrammersChatSource::connect(&config.telegram_api()?, config.telegram_session_file.clone())
            .await?,
    );

    let deps = ServerDeps::new(
        pool,
        ai,
        chat_source.clone(),
        config.parser.clone(),
        config.chats_config_path.clone(),
    );

    if args.once {
        let outcome = run_parse_job(&deps).await?;
        save_session(&chat_source);
        return match outcome {
            ParseJobOutcome::Completed { report, .. } => {
                tracing::info!(saved = report.requests_saved, "Single run complete");
                Ok(())
            }
            ParseJobOutcome::Failed { error, .. } => bail!("Parse run failed: {}", error),
            ParseJobOutcome::AlreadyRunning => Ok(()),
        };
    }

    if !args.skip_initial_run {
        tracing::info!("Running initial parse");
        run_and_log(&deps, "startup").await;
        save_session(&chat_source);
    }

    let mut scheduler = start_scheduler(deps.clone()).await?;

    // The supervisor restarts the listener on connection errors, so it only
    // finishes if it panics.
    let mut listener = tokio::spawn(supervise_parse_listener(deps.clone()));

    let exit = tokio::select! {
        _ = shutdown_signal() => Ok(()),
        result = &mut listener => {
            let error = match result {
                Ok(()) => anyhow!("Parse request listener exited"),
                Err(e) => anyhow!("Parse request listener panicked: {}", e),
            };
            tracing::error!(error = %error, "Stopping worker");
            Err(error)
        }
    };
    listener.abort();

    tracing::info!("Shutting down scheduler");
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }
    save_session(&chat_source);

    tracing::info!("Worker stopped");
    exit
}

fn save_session(source: &GrammersChatSource) {
    if let Err(e) = source.save_session() {
        tracing::warn!(error = %e, "Failed to save userbot session");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
