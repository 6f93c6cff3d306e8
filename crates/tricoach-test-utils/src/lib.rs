//! Test support for the tricoach crates.
//!
//! - [`MemoryStore`]: in-process [`TrainingStore`](tricoach_db::TrainingStore)
//!   used by the engine suites.
//! - [`TestDb`]: a throwaway, migrated PostgreSQL database behind a
//!   [`PgStore`]. The server comes from `TRICOACH_TEST_PG_URL` when set,
//!   otherwise from one testcontainers instance shared by the test binary.
//! - [`fixtures`]: sample profiles, sessions and logs.

pub mod fixtures;
pub mod memory;

use sqlx::{Executor, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use tricoach_db::PgStore;
use tricoach_db::config::DbConfig;
use tricoach_db::pool;

pub use memory::{Fault, MemoryStore};

pub const PG_URL_ENV: &str = "TRICOACH_TEST_PG_URL";

struct Server {
    /// Server URL without a database path.
    url: String,
    _container: Option<ContainerAsync<Postgres>>,
}

static SERVER: OnceCell<Server> = OnceCell::const_new();

async fn start_server() -> Server {
    if let Ok(url) = std::env::var(PG_URL_ENV) {
        return Server {
            url: url.trim_end_matches('/').to_string(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("PostgreSQL container should start (is Docker running?)");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");

    Server {
        url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

async fn server_url() -> &'static str {
    &SERVER.get_or_init(start_server).await.url
}

async fn admin(statement: &str) {
    let config = DbConfig::new(format!("{}/postgres", server_url().await)).with_max_connections(1);
    let maint = pool::create_pool(&config)
        .await
        .expect("maintenance database should accept connections");
    maint
        .execute(statement)
        .await
        .unwrap_or_else(|e| panic!("{statement}: {e}"));
    maint.close().await;
}

/// A migrated database that exists for one test.
pub struct TestDb {
    pub store: PgStore,
    name: String,
}

impl TestDb {
    pub async fn create() -> Self {
        let name = format!("tricoach_test_{}", Uuid::new_v4().simple());
        admin(&format!("CREATE DATABASE {name}")).await;

        let config = DbConfig::new(format!("{}/{name}", server_url().await));
        let db_pool = pool::create_pool(&config)
            .await
            .expect("test database should accept connections");
        pool::run_migrations(&db_pool)
            .await
            .expect("migrations should apply to a fresh database");

        Self {
            store: PgStore::new(db_pool),
            name,
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.store.pool()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the pool and drop the database.
    pub async fn teardown(self) {
        self.store.pool().close().await;
        admin(&format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.name)).await;
    }
}
