//! Worker dependencies for the parse pipeline (using traits for testability)
//!
//! All external services use trait abstractions so tests can swap in the
//! mocks from `test_dependencies`.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{BaseAI, BaseChatSource};
use crate::config::ParserSettings;

/// Ensures at most one parse run at a time within a process.
#[derive(Clone, Default)]
pub struct RunGuard(Arc<Mutex<()>>);

impl RunGuard {
    /// `None` when a run is already in progress.
    pub fn try_acquire(&self) -> Option<OwnedMutexGuard<()>> {
        self.0.clone().try_lock_owned().ok()
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub ai: Arc<dyn BaseAI>,
    pub chat_source: Arc<dyn BaseChatSource>,
    pub settings: ParserSettings,
    /// Re-read on every run so edits apply without a restart.
    pub chats_config_path: PathBuf,
    pub run_guard: RunGuard,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        ai: Arc<dyn BaseAI>,
        chat_source: Arc<dyn BaseChatSource>,
        settings: ParserSettings,
        chats_config_path: PathBuf,
    ) -> Self {
        Self {
            db_pool,
            ai,
            chat_source,
            settings,
            chats_config_path,
            run_guard: RunGuard::default(),
        }
    }
}
