//! # Ledger Store
//!
//! Durable home of the ledger collections. Each collection is one JSON array
//! of records, read and written whole.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    ledger_collections (SQLite)                          │
//! │                                                                         │
//! │  name          │ records                              │ updated_at      │
//! │  ──────────────┼──────────────────────────────────────┼──────────────── │
//! │  companies     │ [{"id":1,"name":"Cipla",...}]        │ 2025-03-01T...  │
//! │  products      │ [{"id":1,"generic_name":...}]        │ 2025-03-01T...  │
//! │  batches       │ [{"id":1,"batch_code":"CP2501",...}] │ 2025-03-02T...  │
//! │  sales         │ [...]                                │ ...             │
//! │                                                                         │
//! │  A missing row reads as an empty collection.                            │
//! │  A row that fails to decode reads as empty (and is logged).            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomic Multi-Collection Write
//! ```text
//! write([(batches, ..), (sales, ..), (customers, ..)])
//!      │
//!      ▼
//! BEGIN ──► UPSERT batches ──► UPSERT sales ──► UPSERT customers ──► COMMIT
//!      │
//!      └── any failure: ROLLBACK, nothing visible
//! ```

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

// =============================================================================
// Collections
// =============================================================================

/// The named record sets the ledger persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Companies,
    Products,
    Customers,
    MarginRules,
    Schemes,
    Batches,
    Purchases,
    Sales,
    Payments,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Companies,
        Collection::Products,
        Collection::Customers,
        Collection::MarginRules,
        Collection::Schemes,
        Collection::Batches,
        Collection::Purchases,
        Collection::Sales,
        Collection::Payments,
    ];

    /// Storage key.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Companies => "companies",
            Collection::Products => "products",
            Collection::Customers => "customers",
            Collection::MarginRules => "margin_rules",
            Collection::Schemes => "schemes",
            Collection::Batches => "batches",
            Collection::Purchases => "purchases",
            Collection::Sales => "sales",
            Collection::Payments => "payments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Deserialize)]
struct IdOnly {
    id: i64,
}

// =============================================================================
// Store Trait
// =============================================================================

/// Raw collection storage.
///
/// Implementations only move JSON text. Decoding, the empty-collection
/// fallback and id assignment live in the provided methods so every backend
/// behaves the same.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Raw JSON array for `collection`, or `None` if it was never written.
    async fn read(&self, collection: Collection) -> DbResult<Option<String>>;

    /// Replaces every listed collection in one atomic step.
    async fn write(&self, entries: Vec<(Collection, String)>) -> DbResult<()>;

    /// Decoded records of `collection`.
    ///
    /// Missing or unreadable data yields an empty list; the store never
    /// fails a read because one collection is damaged.
    async fn load<R>(&self, collection: Collection) -> DbResult<Vec<R>>
    where
        R: DeserializeOwned + Send,
    {
        let Some(raw) = self.read(collection).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<R>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(%collection, error = %e, "Unreadable collection, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Replaces one collection.
    async fn save<R>(&self, collection: Collection, records: &[R]) -> DbResult<()>
    where
        R: Serialize + Sync,
    {
        let entry = encode(collection, records)?;
        self.write(vec![entry]).await
    }

    /// One greater than the largest stored id, or 1 for an empty collection.
    async fn next_id(&self, collection: Collection) -> DbResult<i64> {
        let ids: Vec<IdOnly> = self.load(collection).await?;
        Ok(ids.iter().map(|r| r.id).max().unwrap_or(0) + 1)
    }
}

/// Encodes a collection for a multi-collection [`LedgerStore::write`].
pub fn encode<R: Serialize>(collection: Collection, records: &[R]) -> DbResult<(Collection, String)> {
    Ok((collection, serde_json::to_string(records)?))
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Process-local store for tests and previews.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw text without validation.
    pub async fn put_raw(&self, collection: Collection, raw: impl Into<String>) {
        self.collections.write().await.insert(collection, raw.into());
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn read(&self, collection: Collection) -> DbResult<Option<String>> {
        Ok(self.collections.read().await.get(&collection).cloned())
    }

    async fn write(&self, entries: Vec<(Collection, String)>) -> DbResult<()> {
        // One guard for the whole batch so readers never see half of it.
        let mut collections = self.collections.write().await;
        for (collection, raw) in entries {
            collections.insert(collection, raw);
        }
        Ok(())
    }
}

// =============================================================================
// SQLite Store
// =============================================================================

/// Store backed by the `ledger_collections` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    /// Names of the collections that have been written at least once.
    pub async fn written_collections(&self) -> DbResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM ledger_collections ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn read(&self, collection: Collection) -> DbResult<Option<String>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT records FROM ledger_collections WHERE name = ?1")
            .bind(collection.name())
            .fetch_optional(&self.pool)
            .await?;
        Ok(raw)
    }

    async fn write(&self, entries: Vec<(Collection, String)>) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for (collection, raw) in &entries {
            sqlx::query(
                r#"
                INSERT INTO ledger_collections (name, records, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(name) DO UPDATE SET
                    records = excluded.records,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(collection.name())
            .bind(raw)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(collections = entries.len(), "Ledger collections written");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: i64,
        label: String,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                id: 3,
                label: "three".to_string(),
            },
            Row {
                id: 7,
                label: "seven".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let store = InMemoryStore::new();
        let loaded: Vec<Row> = store.load(Collection::Sales).await.unwrap();
        assert!(loaded.is_empty());
        assert_eq!(store.next_id(Collection::Sales).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_collection_is_empty() {
        let store = InMemoryStore::new();
        store.put_raw(Collection::Batches, "{not json").await;
        let loaded: Vec<Row> = store.load(Collection::Batches).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_and_next_id() {
        let store = InMemoryStore::new();
        store.save(Collection::Products, &rows()).await.unwrap();

        let loaded: Vec<Row> = store.load(Collection::Products).await.unwrap();
        assert_eq!(loaded, rows());
        assert_eq!(store.next_id(Collection::Products).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_sqlite_store_upserts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.ledger();

        store.save(Collection::Customers, &rows()).await.unwrap();
        store.save(Collection::Customers, &rows()[..1]).await.unwrap();

        let loaded: Vec<Row> = store.load(Collection::Customers).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(store.next_id(Collection::Customers).await.unwrap(), 4);
        assert_eq!(store.written_collections().await.unwrap(), vec!["customers".to_string()]);
    }

    #[tokio::test]
    async fn test_sqlite_multi_collection_write() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.ledger();

        let entries = vec![
            encode(Collection::Sales, &rows()).unwrap(),
            encode(Collection::Payments, &rows()[1..]).unwrap(),
        ];
        store.write(entries).await.unwrap();

        let sales: Vec<Row> = store.load(Collection::Sales).await.unwrap();
        let payments: Vec<Row> = store.load(Collection::Payments).await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(payments[0].id, 7);
    }
}
