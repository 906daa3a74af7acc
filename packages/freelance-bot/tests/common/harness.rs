//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test in the binary. Each
//! harness gets its own freshly migrated database on that container, so
//! tests that count or delete rows do not see each other's data.

use anyhow::{Context, Result};
use sqlx::{Executor, PgPool};
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    /// Server URL without a database name.
    server_url: String,
    admin_pool: PgPool,
    // Keep container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=300"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let server_url = format!("postgresql://postgres:postgres@{}:{}", pg_host, pg_port);

        let admin_pool = PgPool::connect(&format!("{}/postgres", server_url))
            .await
            .context("Failed to connect to Postgres")?;

        Ok(Self {
            server_url,
            admin_pool,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Test harness that manages test infrastructure.
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &mut TestHarness) {
///     let pool = &ctx.db_pool;
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    /// Pool for this test's private database.
    pub db_pool: PgPool,
    pub database_url: String,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    /// Create a private database on the shared container and migrate it.
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_name = format!("test_{}", Uuid::new_v4().simple());
        infra
            .admin_pool
            .execute(format!("CREATE DATABASE {}", db_name).as_str())
            .await
            .context("Failed to create test database")?;

        let database_url = format!("{}/{}", infra.server_url, db_name);
        let db_pool = PgPool::connect(&database_url)
            .await
            .context("Failed to connect to test database")?;

        freelance_core::db::run_migrations(&db_pool).await?;

        Ok(Self {
            db_pool,
            database_url,
        })
    }
}
