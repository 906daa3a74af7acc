//! Kernel module - worker infrastructure and dependencies.

pub mod ai;
pub mod deps;
pub mod scheduled_tasks;
pub mod telegram_client;
pub mod test_dependencies;
pub mod traits;
pub mod trigger;

pub use ai::OpenAiCompatible;
pub use deps::{RunGuard, ServerDeps};
pub use telegram_client::GrammersChatSource;
pub use test_dependencies::{MockAI, MockChatSource, TestDependencies};
pub use traits::*;
