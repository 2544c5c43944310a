//! # Database Pool
//!
//! Opens the SQLite file behind the ledger store and applies migrations.
//!
//! ```text
//! MediStockConfig::db_config() ──► DbConfig
//!                                     │
//!                                     ▼
//!                          Database::new(config)
//!                          WAL + create file + migrate
//!                                     │
//!                                     ▼
//!                 db.ledger() ──► SqliteStore ──► LedgerService
//! ```
//!
//! WAL lets queries read while a transaction commits; the service still
//! serializes writers itself.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::store::SqliteStore;

/// Where the ledger lives and how many connections may read it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Private in-memory ledger for tests.
    ///
    /// Each SQLite connection to `:memory:` is its own database, so the pool
    /// is held to one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
        }
    }
}

/// An open, migrated ledger database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening ledger database");

        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        // One connection stays open; an in-memory ledger lives on it.
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        info!(max_connections = config.max_connections, "Ledger database ready");
        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The ledger store over this pool.
    pub fn ledger(&self) -> SqliteStore {
        SqliteStore::new(self.pool.clone())
    }

    /// Closes every connection. Later store calls fail.
    pub async fn close(&self) {
        info!("Closing ledger database");
        self.pool.close().await;
    }
}
