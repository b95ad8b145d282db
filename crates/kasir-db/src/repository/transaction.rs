//! # Transaction Repository
//!
//! Checkout, offline-sync apply, history and payment status updates.
//!
//! ## Checkout Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    INSERT transactions (header)          ← first statement is a write, │
//! │                                            so the tx holds the write   │
//! │                                            lock from here on           │
//! │    for each line:                                                       │
//! │      UPDATE products                                                    │
//! │         SET stock = stock - qty                                         │
//! │       WHERE id = ? AND stock >= qty      ← 0 rows: missing product or  │
//! │                                            short stock, abort          │
//! │      INSERT transaction_items                                           │
//! │  COMMIT                                  (any error: ROLLBACK on drop) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two cashiers selling the last unit at the same time serialize on the
//! SQLite write lock; the second one re-reads the decremented stock and
//! fails with `InsufficientStock`. Stock can never go negative.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction as DbTransaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kasir_core::checkout::{ensure_stock, CheckoutRequest};
use kasir_core::sync::SyncTransaction;
use kasir_core::{
    CoreError, Product, SyncStatus, Transaction, TransactionHistory, TransactionItem,
    TransactionItemDetail, TransactionStatus, TransactionWithItems,
};

const TRANSACTION_COLUMNS: &str = "id, total_amount, payment_method, status, sync_status, \
     cashier_id, midtrans_id, created_at, updated_at";

/// Result of applying one offline transaction.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Recorded now.
    Applied(TransactionWithItems),
    /// A transaction with this id already exists; nothing was touched.
    AlreadyApplied,
}

/// Result of a payment status update.
#[derive(Debug)]
pub enum StatusChange {
    Applied(Transaction),
    /// The stored status did not allow the move (or it was a no-op).
    Unchanged(Transaction),
}

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Records an online checkout for `cashier_id`.
    ///
    /// The request must already be validated. Status follows the payment
    /// method: CASH is PAID immediately, CARD and QRIS start PENDING.
    pub async fn checkout(
        &self,
        cashier_id: &str,
        request: &CheckoutRequest,
    ) -> DbResult<TransactionWithItems> {
        let id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;
        let recorded = record_checkout(
            &mut tx,
            &id,
            cashier_id,
            request,
            Utc::now(),
            SyncStatus::Online,
        )
        .await?;
        tx.commit().await?;

        info!(
            id = %recorded.transaction.id,
            total = %recorded.transaction.total_amount,
            status = %recorded.transaction.status,
            "Checkout recorded"
        );

        Ok(recorded)
    }

    /// Applies one transaction recorded offline, keyed by its client id.
    ///
    /// Replaying an id that is already stored returns
    /// [`ApplyOutcome::AlreadyApplied`] without touching stock. The
    /// pre-check is only a fast path: the primary key on `transactions.id`
    /// settles two concurrent replays of the same id.
    pub async fn apply_synced(
        &self,
        cashier_id: &str,
        offline: &SyncTransaction,
    ) -> DbResult<ApplyOutcome> {
        if self.exists(&offline.id).await? {
            debug!(id = %offline.id, "Offline transaction already applied");
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let mut tx = self.pool.begin().await?;
        let recorded = match record_checkout(
            &mut tx,
            &offline.id,
            cashier_id,
            &offline.data,
            offline.created_at,
            SyncStatus::Synced,
        )
        .await
        {
            Ok(recorded) => recorded,
            Err(e) if e.is_unique_violation_on("transactions.id") => {
                debug!(id = %offline.id, "Offline transaction applied concurrently");
                return Ok(ApplyOutcome::AlreadyApplied);
            }
            Err(e) => return Err(e),
        };
        tx.commit().await?;

        info!(id = %offline.id, total = %recorded.transaction.total_amount, "Offline transaction applied");
        Ok(ApplyOutcome::Applied(recorded))
    }

    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT id FROM transactions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TransactionWithItems>> {
        let Some(transaction) = self.header(id).await? else {
            return Ok(None);
        };

        let items: Vec<TransactionItem> = sqlx::query_as(
            r#"
            SELECT id, transaction_id, product_id, quantity, price_at_record
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(TransactionWithItems { transaction, items }))
    }

    /// Transactions of one cashier, newest first, items with their product.
    pub async fn history(&self, cashier_id: &str) -> DbResult<Vec<TransactionHistory>> {
        let headers: Vec<Transaction> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE cashier_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(cashier_id)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<TransactionItemDetail> = sqlx::query_as(
            r#"
            SELECT
                ti.id, ti.transaction_id, ti.product_id,
                p.name AS product_name,
                p.sku  AS product_sku,
                ti.quantity, ti.price_at_record
            FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            JOIN products p ON p.id = ti.product_id
            WHERE t.cashier_id = ?1
            ORDER BY ti.rowid
            "#,
        )
        .bind(cashier_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_transaction: HashMap<String, Vec<TransactionItemDetail>> = HashMap::new();
        for item in items {
            by_transaction
                .entry(item.transaction_id.clone())
                .or_default()
                .push(item);
        }

        Ok(headers
            .into_iter()
            .map(|transaction| {
                let items = by_transaction.remove(&transaction.id).unwrap_or_default();
                TransactionHistory { transaction, items }
            })
            .collect())
    }

    /// Moves a PENDING transaction to `next`, recording the gateway reference.
    ///
    /// Terminal transactions are left alone and reported as
    /// [`StatusChange::Unchanged`]. The `WHERE status = 'PENDING'` guard keeps
    /// two racing callbacks from both applying.
    pub async fn update_status(
        &self,
        id: &str,
        next: TransactionStatus,
        midtrans_id: Option<&str>,
    ) -> DbResult<StatusChange> {
        let current = self
            .header(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        if current.status == next {
            return Ok(StatusChange::Unchanged(current));
        }
        if let Err(e) = current.status.transition_to(next) {
            warn!(id = %id, error = %e, "Ignoring status update");
            return Ok(StatusChange::Unchanged(current));
        }

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = ?2,
                midtrans_id = COALESCE(?3, midtrans_id),
                updated_at = ?4
            WHERE id = ?1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(next)
        .bind(midtrans_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let updated = self
            .header(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        if result.rows_affected() == 0 {
            warn!(id = %id, status = %updated.status, "Status changed concurrently");
            return Ok(StatusChange::Unchanged(updated));
        }

        info!(id = %id, from = %current.status, to = %next, "Transaction status updated");
        Ok(StatusChange::Applied(updated))
    }

    async fn header(&self, id: &str) -> DbResult<Option<Transaction>> {
        let transaction: Option<Transaction> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }
}

/// Writes header, stock decrements and items on `tx`.
///
/// Every query goes through `tx`; touching the pool here would wait on a
/// connection this transaction is holding.
async fn record_checkout(
    tx: &mut DbTransaction<'_, Sqlite>,
    id: &str,
    cashier_id: &str,
    request: &CheckoutRequest,
    created_at: DateTime<Utc>,
    sync_status: SyncStatus,
) -> DbResult<TransactionWithItems> {
    let now = Utc::now();
    let transaction = Transaction {
        id: id.to_string(),
        total_amount: request.total_amount().map_err(CoreError::from)?,
        payment_method: request.payment_method,
        status: request.payment_method.initial_status(),
        sync_status,
        cashier_id: cashier_id.to_string(),
        midtrans_id: None,
        created_at,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, total_amount, payment_method, status, sync_status,
            cashier_id, midtrans_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8)
        "#,
    )
    .bind(&transaction.id)
    .bind(transaction.total_amount)
    .bind(transaction.payment_method)
    .bind(transaction.status)
    .bind(transaction.sync_status)
    .bind(&transaction.cashier_id)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(&mut **tx)
    .await?;

    let mut items = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let decremented = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?1, updated_at = ?2
            WHERE id = ?3 AND stock >= ?1
            "#,
        )
        .bind(line.quantity)
        .bind(now)
        .bind(&line.product_id)
        .execute(&mut **tx)
        .await?;

        if decremented.rows_affected() == 0 {
            let product: Option<Product> = sqlx::query_as(
                "SELECT id, sku, name, price, stock, category_id, image, created_at, updated_at \
                 FROM products WHERE id = ?1",
            )
            .bind(&line.product_id)
            .fetch_optional(&mut **tx)
            .await?;

            let product =
                product.ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            ensure_stock(&product, line.quantity)?;
            return Err(DbError::QueryFailed(format!(
                "stock update for product {} matched no rows",
                product.id
            )));
        }

        let item = TransactionItem {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction.id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            price_at_record: line.price_at_record,
        };

        sqlx::query(
            r#"
            INSERT INTO transaction_items (id, transaction_id, product_id, quantity, price_at_record)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&item.id)
        .bind(&item.transaction_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.price_at_record)
        .execute(&mut **tx)
        .await?;

        items.push(item);
    }

    Ok(TransactionWithItems { transaction, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{new_product, seeded_db};
    use chrono::TimeZone;
    use kasir_core::checkout::CheckoutItem;
    use kasir_core::{Money, PaymentMethod, ValidationError};

    fn line(product_id: &str, quantity: i64, price: i64) -> CheckoutItem {
        CheckoutItem {
            product_id: product_id.to_string(),
            quantity,
            price_at_record: Money::from_rupiah(price),
        }
    }

    async fn stock_of(db: &crate::Database, id: &str) -> i64 {
        db.products()
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .product
            .stock
    }

    #[tokio::test]
    async fn test_cash_checkout_is_paid_and_decrements_stock() {
        let (db, f) = seeded_db().await;
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![line(&f.nasi, 2, 25_000)],
        };

        let recorded = db.transactions().checkout("cashier-1", &request).await.unwrap();

        assert_eq!(recorded.transaction.total_amount, Money::from_rupiah(50_000));
        assert_eq!(recorded.transaction.status, TransactionStatus::Paid);
        assert_eq!(recorded.transaction.sync_status, SyncStatus::Online);
        assert_eq!(recorded.items.len(), 1);
        assert_eq!(stock_of(&db, &f.nasi).await, 3);
    }

    #[tokio::test]
    async fn test_mixed_cart_total_uses_price_at_record() {
        let (db, f) = seeded_db().await;
        // Client-side prices win over the catalog price.
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Qris,
            items: vec![line(&f.nasi, 1, 24_000), line(&f.teh, 4, 6_000)],
        };

        let recorded = db.transactions().checkout("cashier-1", &request).await.unwrap();

        assert_eq!(recorded.transaction.total_amount, Money::from_rupiah(48_000));
        assert_eq!(recorded.transaction.status, TransactionStatus::Pending);
        assert_eq!(stock_of(&db, &f.teh).await, 96);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let (db, f) = seeded_db().await;
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![line(&f.teh, 1, 5_000), line(&f.kopi, 2, 10_000)],
        };

        let err = db.transactions().checkout("cashier-1", &request).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Business(CoreError::InsufficientStock { ref product, available: 1, requested: 2 })
                if product == "Kopi Hitam Toraja"
        ));
        assert_eq!(stock_of(&db, &f.kopi).await, 1);
        assert_eq!(stock_of(&db, &f.teh).await, 100);
        assert!(db.transactions().history("cashier-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (db, _) = seeded_db().await;
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![line("missing", 1, 1_000)],
        };

        let err = db.transactions().checkout("cashier-1", &request).await.unwrap_err();
        assert!(matches!(err, DbError::Business(CoreError::ProductNotFound(ref id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_last_unit_sells_once() {
        let (db, f) = seeded_db().await;
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![line(&f.kopi, 1, 10_000)],
        };

        let repo = db.transactions();
        assert!(repo.checkout("cashier-1", &request).await.is_ok());
        assert!(repo.checkout("cashier-2", &request).await.is_err());
        assert_eq!(stock_of(&db, &f.kopi).await, 0);
    }

    #[tokio::test]
    async fn test_apply_synced_is_idempotent() {
        let (db, f) = seeded_db().await;
        let created_at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let offline = SyncTransaction {
            id: "offline-1".to_string(),
            data: CheckoutRequest {
                payment_method: PaymentMethod::Cash,
                items: vec![line(&f.nasi, 2, 25_000)],
            },
            created_at,
        };
        let repo = db.transactions();

        let first = repo.apply_synced("cashier-1", &offline).await.unwrap();
        let ApplyOutcome::Applied(recorded) = first else {
            panic!("expected first apply to record");
        };
        assert_eq!(recorded.transaction.id, "offline-1");
        assert_eq!(recorded.transaction.sync_status, SyncStatus::Synced);
        assert_eq!(recorded.transaction.created_at, created_at);

        let second = repo.apply_synced("cashier-1", &offline).await.unwrap();
        assert!(matches!(second, ApplyOutcome::AlreadyApplied));
        assert_eq!(stock_of(&db, &f.nasi).await, 3);
    }

    #[tokio::test]
    async fn test_history_is_scoped_and_newest_first() {
        let (db, f) = seeded_db().await;
        let repo = db.transactions();
        let cash = |items| CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items,
        };

        let older = SyncTransaction {
            id: "offline-old".to_string(),
            data: cash(vec![line(&f.teh, 1, 5_000)]),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };
        repo.apply_synced("cashier-1", &older).await.unwrap();
        let newer = repo
            .checkout("cashier-1", &cash(vec![line(&f.nasi, 1, 25_000), line(&f.teh, 2, 5_000)]))
            .await
            .unwrap();
        repo.checkout("cashier-2", &cash(vec![line(&f.teh, 1, 5_000)]))
            .await
            .unwrap();

        let history = repo.history("cashier-1").await.unwrap();
        let ids: Vec<_> = history.iter().map(|h| h.transaction.id.as_str()).collect();
        assert_eq!(ids, vec![newer.transaction.id.as_str(), "offline-old"]);
        assert_eq!(history[0].items.len(), 2);
        assert_eq!(history[0].items[0].product_name, "Nasi Goreng Spesial");
        assert_eq!(history[0].items[1].product_sku, "DRINK-001");
    }

    #[tokio::test]
    async fn test_update_status_only_from_pending() {
        let (db, f) = seeded_db().await;
        let repo = db.transactions();
        let pending = repo
            .checkout(
                "cashier-1",
                &CheckoutRequest {
                    payment_method: PaymentMethod::Card,
                    items: vec![line(&f.teh, 1, 5_000)],
                },
            )
            .await
            .unwrap();
        let id = pending.transaction.id.as_str();

        let change = repo
            .update_status(id, TransactionStatus::Paid, Some("mt-123"))
            .await
            .unwrap();
        let StatusChange::Applied(paid) = change else {
            panic!("expected PENDING -> PAID to apply");
        };
        assert_eq!(paid.status, TransactionStatus::Paid);
        assert_eq!(paid.midtrans_id.as_deref(), Some("mt-123"));

        let change = repo
            .update_status(id, TransactionStatus::Cancelled, None)
            .await
            .unwrap();
        assert!(matches!(change, StatusChange::Unchanged(ref t) if t.status == TransactionStatus::Paid));

        let err = repo
            .update_status("missing", TransactionStatus::Paid, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_overflowing_total_is_rejected_before_any_write() {
        let (db, f) = seeded_db().await;
        let half = i64::MAX / 2 + 1;
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![line(&f.teh, 1, half), line(&f.teh, 1, half)],
        };

        let err = db.transactions().checkout("cashier-1", &request).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Business(CoreError::Validation(ValidationError::TooLarge { .. }))
        ));
        assert_eq!(stock_of(&db, &f.teh).await, 100);
        assert!(db.transactions().history("cashier-1").await.unwrap().is_empty());
    }

    // =========================================================================
    // Concurrency (file-backed, several pool connections)
    // =========================================================================

    async fn file_db(dir: &tempfile::TempDir, stock: i64) -> (crate::Database, String) {
        let db = crate::Database::new(
            crate::DbConfig::new(dir.path().join("kasir.db")).max_connections(8),
        )
        .await
        .unwrap();
        let product = db
            .products()
            .insert(&new_product("DRINK-003", "Kopi Hitam Toraja", 10_000, stock, None))
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replays_apply_once() {
        let dir = tempfile::tempdir().unwrap();
        let (db, kopi) = file_db(&dir, 100).await;
        let offline = SyncTransaction {
            id: "offline-race".to_string(),
            data: CheckoutRequest {
                payment_method: PaymentMethod::Cash,
                items: vec![line(&kopi, 2, 10_000)],
            },
            created_at: Utc::now(),
        };

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let repo = db.transactions();
                let offline = offline.clone();
                tokio::spawn(async move { repo.apply_synced("cashier-1", &offline).await })
            })
            .collect();

        let mut applied = 0;
        for task in tasks {
            match task.await.unwrap().unwrap() {
                ApplyOutcome::Applied(_) => applied += 1,
                ApplyOutcome::AlreadyApplied => {}
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(stock_of(&db, &kopi).await, 98);
        assert_eq!(db.transactions().history("cashier-1").await.unwrap().len(), 1);
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_sell_last_unit_once() {
        let dir = tempfile::tempdir().unwrap();
        let (db, kopi) = file_db(&dir, 1).await;
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![line(&kopi, 1, 10_000)],
        };

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let repo = db.transactions();
                let request = request.clone();
                tokio::spawn(async move { repo.checkout(&format!("cashier-{i}"), &request).await })
            })
            .collect();

        let mut sold = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => sold += 1,
                Err(e) => assert!(
                    matches!(e, DbError::Business(CoreError::InsufficientStock { .. })),
                    "unexpected error: {e}"
                ),
            }
        }

        assert_eq!(sold, 1);
        assert_eq!(stock_of(&db, &kopi).await, 0);
        db.close().await;
    }
}
