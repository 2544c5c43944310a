//! # medistock-db: Ledger Store and Transaction Service
//!
//! Persists the ledger collections and runs medistock-core transactions
//! against them, all-or-nothing.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediStock Data Flow                              │
//! │                                                                         │
//! │  Back-office action (record sale)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   medistock-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ LedgerService │    │  LedgerStore  │    │   Database   │  │   │
//! │  │   │ (service.rs)  │───►│  (store.rs)   │───►│  (pool.rs)   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ load → Books  │    │ SqliteStore   │    │ SqlitePool   │  │   │
//! │  │   │ core txn      │    │ InMemoryStore │    │ migrations   │  │   │
//! │  │   │ atomic write  │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   MediStockConfig (config.rs): TOML + env → DbConfig, settings │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ledger_collections(name, records JSON, updated_at)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`store`] - Collection store trait and its SQLite / in-memory backends
//! - [`service`] - Transactions, master maintenance and queries
//! - [`config`] - `medistock.toml` loading with environment overrides
//! - [`error`] - Store, service and config error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medistock_db::{Database, LedgerService, MediStockConfig};
//!
//! let config = MediStockConfig::load_or_default(None);
//! let db = Database::new(config.db_config()).await?;
//! let service = LedgerService::new(db.ledger(), config.ledger_settings());
//!
//! let receipt = service.record_sale(&draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod service;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::MediStockConfig;
pub use error::{ConfigError, DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};
pub use service::LedgerService;
pub use store::{Collection, InMemoryStore, LedgerStore, SqliteStore};
