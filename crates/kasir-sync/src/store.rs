//! # Local Store
//!
//! Device-local SQLite database: the offline transaction queue and a cache
//! of the server catalog for browsing while offline.
//!
//! ## Queue Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  local_transactions row lifecycle                        │
//! │                                                                         │
//! │  queue_offline()         is_synced=0 attempts=0                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  POST /sync ──► success ──► mark_synced()  is_synced=1 synced_at=now    │
//! │       │                                                                 │
//! │       └──────► failed ───► mark_failed()   attempts+1 last_error=msg    │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                    attempts >= max_attempts: dead letter                │
//! │                    (kept, no longer sent, reported in status)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use kasir_core::checkout::{CheckoutItem, CheckoutRequest};
use kasir_core::sync::SyncTransaction;
use kasir_core::{Money, PaymentMethod, ProductDetail};
use kasir_db::{connect_pool, DbConfig};

use crate::error::{SyncError, SyncResult};

/// Embedded migrations for the device-local schema.
static LOCAL_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/local");

const QUEUE_COLUMNS: &str = "local_id, offline_id, payment_method, items, total_amount, \
     created_at, is_synced, attempts, last_error, synced_at";

// =============================================================================
// Rows
// =============================================================================

/// A transaction waiting in (or already drained from) the local queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTransaction {
    pub local_id: i64,
    /// Idempotency key; becomes the server transaction id.
    pub offline_id: String,
    pub payment_method: PaymentMethod,
    pub items: Vec<CheckoutItem>,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub is_synced: bool,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl QueuedTransaction {
    /// Wire form sent in `POST /sync`.
    pub fn to_sync_transaction(&self) -> SyncTransaction {
        SyncTransaction {
            id: self.offline_id.clone(),
            data: CheckoutRequest {
                payment_method: self.payment_method,
                items: self.items.clone(),
            },
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    local_id: i64,
    offline_id: String,
    payment_method: PaymentMethod,
    items: String,
    total_amount: Money,
    created_at: DateTime<Utc>,
    is_synced: bool,
    attempts: i64,
    last_error: Option<String>,
    synced_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueueRow> for QueuedTransaction {
    type Error = serde_json::Error;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        Ok(QueuedTransaction {
            local_id: row.local_id,
            offline_id: row.offline_id,
            payment_method: row.payment_method,
            items: serde_json::from_str(&row.items)?,
            total_amount: row.total_amount,
            created_at: row.created_at,
            is_synced: row.is_synced,
            attempts: row.attempts,
            last_error: row.last_error,
            synced_at: row.synced_at,
        })
    }
}

/// Catalog entry cached for offline browsing.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CachedProduct {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub category_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Queue size by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: i64,
    pub synced: i64,
    pub dead_letters: i64,
}

// =============================================================================
// Local Store
// =============================================================================

#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Opens (creating if needed) the local database and applies its
    /// migrations.
    pub async fn open(config: DbConfig) -> SyncResult<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = connect_pool(&config).await?;
        LOCAL_MIGRATOR.run(&pool).await?;

        info!(path = %config.database_path.display(), "Local store ready");
        Ok(LocalStore { pool })
    }

    /// Fresh in-memory store for tests.
    pub async fn in_memory() -> SyncResult<Self> {
        Self::open(DbConfig::in_memory()).await
    }

    // =========================================================================
    // Offline queue
    // =========================================================================

    /// Records a sale made while offline. The request is validated with the
    /// same rules the server applies.
    pub async fn queue_offline(&self, request: &CheckoutRequest) -> SyncResult<QueuedTransaction> {
        request.validate()?;

        let offline_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let total_amount = request.total_amount()?;
        let items = serde_json::to_string(&request.items)?;

        let result = sqlx::query(
            r#"
            INSERT INTO local_transactions (
                offline_id, payment_method, items, total_amount, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&offline_id)
        .bind(request.payment_method)
        .bind(&items)
        .bind(total_amount)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        debug!(offline_id = %offline_id, total = %total_amount, "Queued offline transaction");

        Ok(QueuedTransaction {
            local_id: result.last_insert_rowid(),
            offline_id,
            payment_method: request.payment_method,
            items: request.items.clone(),
            total_amount,
            created_at,
            is_synced: false,
            attempts: 0,
            last_error: None,
            synced_at: None,
        })
    }

    /// Unsynced rows still under the attempt limit, oldest first.
    pub async fn pending(&self, limit: usize, max_attempts: i64) -> SyncResult<Vec<QueuedTransaction>> {
        let rows: Vec<QueueRow> = sqlx::query_as(&format!(
            "SELECT {QUEUE_COLUMNS} FROM local_transactions \
             WHERE is_synced = 0 AND attempts < ?1 \
             ORDER BY local_id ASC LIMIT ?2"
        ))
        .bind(max_attempts)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        into_queued(rows)
    }

    /// Unsynced rows that ran out of attempts.
    pub async fn dead_letters(&self, max_attempts: i64) -> SyncResult<Vec<QueuedTransaction>> {
        let rows: Vec<QueueRow> = sqlx::query_as(&format!(
            "SELECT {QUEUE_COLUMNS} FROM local_transactions \
             WHERE is_synced = 0 AND attempts >= ?1 \
             ORDER BY local_id ASC"
        ))
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;

        into_queued(rows)
    }

    pub async fn get(&self, offline_id: &str) -> SyncResult<Option<QueuedTransaction>> {
        let row: Option<QueueRow> = sqlx::query_as(&format!(
            "SELECT {QUEUE_COLUMNS} FROM local_transactions WHERE offline_id = ?1"
        ))
        .bind(offline_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(QueuedTransaction::try_from).transpose()?)
    }

    /// Marks acknowledged ids as synced. Unknown ids are ignored.
    pub async fn mark_synced(&self, offline_ids: &[String]) -> SyncResult<u64> {
        if offline_ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;
        for id in offline_ids {
            updated += sqlx::query(
                "UPDATE local_transactions SET is_synced = 1, synced_at = ?2, last_error = NULL \
                 WHERE offline_id = ?1 AND is_synced = 0",
            )
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;

        debug!(count = updated, "Marked transactions as synced");
        Ok(updated)
    }

    /// Records a server rejection. Returns the new attempt count, or `None`
    /// if the id is not queued.
    pub async fn mark_failed(&self, offline_id: &str, error: &str) -> SyncResult<Option<i64>> {
        let attempts: Option<i64> = sqlx::query_scalar(
            "UPDATE local_transactions SET attempts = attempts + 1, last_error = ?2 \
             WHERE offline_id = ?1 AND is_synced = 0 \
             RETURNING attempts",
        )
        .bind(offline_id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempts)
    }

    pub async fn counts(&self, max_attempts: i64) -> SyncResult<QueueCounts> {
        let (pending, synced, dead_letters): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_synced = 0 AND attempts < ?1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_synced = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_synced = 0 AND attempts >= ?1 THEN 1 ELSE 0 END), 0)
            FROM local_transactions
            "#,
        )
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(QueueCounts {
            pending,
            synced,
            dead_letters,
        })
    }

    // =========================================================================
    // Product cache
    // =========================================================================

    /// Replaces the cached catalog with `products` in one local transaction.
    pub async fn replace_products(&self, products: &[ProductDetail]) -> SyncResult<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM local_products")
            .execute(&mut *tx)
            .await?;

        for detail in products {
            let p = &detail.product;
            sqlx::query(
                r#"
                INSERT INTO local_products (id, name, price, stock, category_id, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&p.id)
            .bind(&p.name)
            .bind(p.price)
            .bind(p.stock)
            .bind(&p.category_id)
            .bind(p.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(count = products.len(), "Product cache refreshed");
        Ok(products.len())
    }

    pub async fn products(&self) -> SyncResult<Vec<CachedProduct>> {
        let products: Vec<CachedProduct> = sqlx::query_as(
            "SELECT id, name, price, stock, category_id, updated_at \
             FROM local_products ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn into_queued(rows: Vec<QueueRow>) -> SyncResult<Vec<QueuedTransaction>> {
    rows.into_iter()
        .map(|row| QueuedTransaction::try_from(row).map_err(SyncError::from))
        .collect()
}
