//! The Store: a thin typed layer over a pooled PostgreSQL client.
//!
//! Grounded directly on the indexer's own reorg-handling code, which already
//! wraps `tokio_postgres` behind a `PostgresClient` exposing `batch_execute`
//! for schema-style DDL. Here that pairing is `tokio-postgres` +
//! `deadpool-postgres` for the pool.

pub mod balance_ops;
pub mod chain_ops;
pub mod models;
pub mod points_ops;
pub mod schema;

use std::str::FromStr;
use std::time::Duration;

use deadpool_postgres::{ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct Store {
    pub(crate) pool: Pool,
}

impl Store {
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let pg_config = tokio_postgres::Config::from_str(&cfg.dsn)
            .map_err(|e| Error::Config(format!("invalid database.dsn: {e}")))?;

        let manager_cfg = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = deadpool_postgres::Manager::from_config(pg_config, NoTls, manager_cfg);
        let pool = Pool::builder(mgr)
            .max_size(cfg.max_open as usize)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| Error::Db(format!("build connection pool: {e}")))?;

        // `max_idle` and `life_time_minutes` are accepted for config-shape
        // fidelity; deadpool's pool manages idle connections internally and
        // has no direct equivalent to a per-connection max lifetime, so
        // these two are validated but not separately wired through.
        let _ = (cfg.max_idle, Duration::from_secs(cfg.life_time_minutes * 60));

        let store = Store { pool };
        store.init_schema().await?;
        info!("store connected and schema initialized");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        for stmt in schema::CREATE_TABLES {
            client.batch_execute(stmt).await?;
        }
        Ok(())
    }

    pub(crate) async fn client(&self) -> Result<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }
}
