//! Test harness with testcontainers for warehouse integration tests.
//!
//! One Postgres container and one migration run are shared by every test.
//! Each test gets its own schema holding copies of the destination tables,
//! so tests can run concurrently without seeing each other's rows.

use anyhow::{Context, Result};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use watchman::{PostgresWarehouse, SinkLoader, TableId, TableNames};

const TABLES: &[&str] = &[
    "reddit_new_posts",
    "reddit_hot_posts",
    "tweets",
    "close_price",
    "close_price_delta",
    "ticker_not_found",
    "trending",
    "ticker_variants",
];

struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --ignored --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        // MERGE needs Postgres 15 or newer
        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = postgres.get_host().await?;
        let port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
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

/// Per-test view of the shared database.
///
/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// #[ignore = "requires Docker"]
/// async fn my_test(ctx: &mut TestHarness) {
///     ctx.loader().append(&ctx.tables.tweets, &records).await.unwrap();
/// }
/// ```
pub struct TestHarness {
    pub db_pool: PgPool,
    pub schema: String,
    pub tables: TableNames,
    pub ticker_variants: TableId,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        let _ = sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&self.db_pool)
            .await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let schema = format!("test_{}", Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE SCHEMA {}", schema))
            .execute(&db_pool)
            .await?;
        for table in TABLES {
            sqlx::query(&format!(
                "CREATE TABLE {schema}.{table} (LIKE public.{table} INCLUDING ALL)"
            ))
            .execute(&db_pool)
            .await?;
        }

        Ok(Self {
            tables: TableNames::in_schema(&schema)?,
            ticker_variants: TableId::parse(&format!("{}.ticker_variants", schema))?,
            db_pool,
            schema,
        })
    }

    pub fn warehouse(&self) -> PostgresWarehouse {
        PostgresWarehouse::from_pool(self.db_pool.clone())
    }

    pub fn loader(&self) -> SinkLoader<PostgresWarehouse> {
        SinkLoader::new(self.warehouse())
    }
}
