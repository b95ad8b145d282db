//! # Sync Reconciler
//!
//! Replays the offline queue against `POST /sync` and refreshes the product
//! cache from `GET /products`.
//!
//! ## Reconciliation Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reconciliation Cycle                               │
//! │                                                                         │
//! │  local_transactions                                                     │
//! │  offline_id | attempts | is_synced                                      │
//! │  ───────────┼──────────┼──────────                                      │
//! │  a1b2...    │ 0        │ 0          ──┐                                 │
//! │  c3d4...    │ 3        │ 0          ──┼─► 1. pending (attempts < max)   │
//! │  e5f6...    │ 10       │ 0          ──┼─► dead letter: warn, skip       │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                      2. POST /sync {transactions: [...]}                │
//! │                                       │                                 │
//! │                   ┌───────────────────┴──────────────┐                  │
//! │                   ▼                                  ▼                  │
//! │  3. success ids: is_synced = 1       failed ids: attempts += 1,         │
//! │     synced_at = now                  last_error = server message        │
//! │                                                                         │
//! │  Batch never reached the server ─► nothing is touched                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only one cycle runs at a time. A trigger that arrives while a cycle is in
//! flight returns [`RunOutcome::Busy`]; the server treats a replayed id as
//! already applied, so overlapping cycles from separate processes are safe
//! too.

use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use kasir_core::sync::BulkSyncRequest;

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::store::LocalStore;
use crate::transport::HttpTransport;

// =============================================================================
// Cycle Results
// =============================================================================

/// What one call to [`Reconciler::sync_transactions`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another cycle holds the guard.
    Busy,
    /// Nothing was waiting to be sent.
    Idle,
    Completed(CycleReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Items sent in the batch.
    pub sent: usize,
    /// Items the server accepted (including replays it already had).
    pub synced: u64,
    /// Items the server rejected this cycle.
    pub failed: usize,
    /// Rejected items that just reached the attempt limit.
    pub exhausted: usize,
    /// Items skipped because they were already past the limit.
    pub dead_letters: usize,
}

// =============================================================================
// Reconciler
// =============================================================================

pub struct Reconciler {
    store: LocalStore,
    transport: HttpTransport,
    batch_size: usize,
    max_attempts: i64,
    guard: Mutex<()>,
}

impl Reconciler {
    pub fn new(store: LocalStore, transport: HttpTransport, config: &SyncConfig) -> Self {
        Reconciler {
            store,
            transport,
            batch_size: config.sync.batch_size,
            max_attempts: config.sync.max_attempts,
            guard: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn max_attempts(&self) -> i64 {
        self.max_attempts
    }

    /// Sends one batch of unsynced transactions and records the outcome of
    /// every item.
    ///
    /// An `Err` means the batch did not get an answer (network down, 5xx
    /// after backoff, 401). No row is modified in that case and no attempt
    /// is consumed.
    pub async fn sync_transactions(&self) -> SyncResult<RunOutcome> {
        let Ok(_guard) = self.guard.try_lock() else {
            debug!("Sync already in progress, skipping");
            return Ok(RunOutcome::Busy);
        };

        let dead_letters = self.store.dead_letters(self.max_attempts).await?;
        for entry in &dead_letters {
            warn!(
                offline_id = %entry.offline_id,
                attempts = entry.attempts,
                last_error = entry.last_error.as_deref().unwrap_or(""),
                "Skipping transaction that exceeded max retry attempts"
            );
        }

        let pending = self.store.pending(self.batch_size, self.max_attempts).await?;
        if pending.is_empty() {
            debug!("No pending offline transactions");
            return Ok(RunOutcome::Idle);
        }

        info!(count = pending.len(), "Syncing offline transactions");

        let batch = BulkSyncRequest {
            transactions: pending.iter().map(|t| t.to_sync_transaction()).collect(),
        };
        let report = self.transport.push_transactions(&batch).await?;

        let synced = self.store.mark_synced(&report.success).await?;

        let mut exhausted = 0;
        for failure in &report.failed {
            error!(offline_id = %failure.id, error = %failure.error, "Server rejected offline transaction");

            match self.store.mark_failed(&failure.id, &failure.error).await? {
                Some(attempts) if attempts >= self.max_attempts => {
                    exhausted += 1;
                    warn!(
                        offline_id = %failure.id,
                        attempts,
                        "Offline transaction reached max retry attempts, no longer retried"
                    );
                }
                Some(_) => {}
                None => warn!(offline_id = %failure.id, "Server reported unknown offline id"),
            }
        }

        let answered: HashSet<&str> = report
            .success
            .iter()
            .map(String::as_str)
            .chain(report.failed.iter().map(|f| f.id.as_str()))
            .collect();
        let unanswered = pending
            .iter()
            .filter(|t| !answered.contains(t.offline_id.as_str()))
            .count();
        if unanswered > 0 {
            warn!(count = unanswered, "Server response omitted some items, they stay queued");
        }

        if synced > 0 {
            info!("Successfully synced {} transactions.", synced);
        }

        Ok(RunOutcome::Completed(CycleReport {
            sent: pending.len(),
            synced,
            failed: report.failed.len(),
            exhausted,
            dead_letters: dead_letters.len(),
        }))
    }

    /// Replaces the local product cache with the server catalog.
    pub async fn sync_products(&self) -> SyncResult<usize> {
        let products = self.transport.fetch_products().await?;
        self.store.replace_products(&products).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportConfig;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use kasir_core::checkout::{CheckoutItem, CheckoutRequest};
    use kasir_core::sync::{SyncReport, SyncTransaction};
    use kasir_core::{Money, PaymentMethod};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    /// Stub server state: every batch received, and the ids to reject.
    #[derive(Clone, Default)]
    struct Stub {
        batches: Arc<StdMutex<Vec<Vec<String>>>>,
        reject: Arc<StdMutex<HashSet<String>>>,
    }

    async fn sync_handler(
        State(stub): State<Stub>,
        Json(batch): Json<BulkSyncRequest>,
    ) -> Json<Value> {
        let ids: Vec<String> = batch.transactions.iter().map(|t: &SyncTransaction| t.id.clone()).collect();
        stub.batches.lock().unwrap().push(ids.clone());

        let reject = stub.reject.lock().unwrap().clone();
        let mut report = SyncReport::default();
        for id in ids {
            if reject.contains(&id) {
                report.failed(id, "Insufficient stock for product: Es Teh Manis");
            } else {
                report.succeeded(id);
            }
        }
        Json(json!({"success": true, "data": report}))
    }

    async fn products_handler() -> Json<Value> {
        Json(json!({"success": true, "data": [{
            "id": "p1", "sku": "FOOD-001", "name": "Nasi Goreng Spesial",
            "price": 25000, "stock": 5, "categoryId": null, "image": null,
            "createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-01T00:00:00Z",
            "category": null
        }]}))
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v1")
    }

    async fn reconciler_for(base_url: String, max_attempts: i64) -> Reconciler {
        let mut config = SyncConfig::new();
        config.server.url = base_url.clone();
        config.sync.max_attempts = max_attempts;

        let transport = HttpTransport::new(TransportConfig {
            base_url,
            auth_token: Some("token".into()),
            request_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(20),
            max_elapsed: Duration::from_millis(100),
        })
        .unwrap();

        Reconciler::new(LocalStore::in_memory().await.unwrap(), transport, &config)
    }

    fn cart() -> CheckoutRequest {
        CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![CheckoutItem {
                product_id: "p1".into(),
                quantity: 1,
                price_at_record: Money::from_rupiah(5_000),
            }],
        }
    }

    async fn stub_server(stub: Stub) -> String {
        let app = Router::new()
            .route("/api/v1/sync", post(sync_handler))
            .route("/api/v1/products", get(products_handler))
            .with_state(stub);
        serve(app).await
    }

    #[tokio::test]
    async fn test_empty_queue_is_idle() {
        let stub = Stub::default();
        let reconciler = reconciler_for(stub_server(stub.clone()).await, 10).await;

        assert_eq!(reconciler.sync_transactions().await.unwrap(), RunOutcome::Idle);
        assert!(stub.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_marks_successes_and_counts_failures() {
        let stub = Stub::default();
        let reconciler = reconciler_for(stub_server(stub.clone()).await, 10).await;
        let store = reconciler.store();

        let ok = store.queue_offline(&cart()).await.unwrap();
        let bad = store.queue_offline(&cart()).await.unwrap();
        stub.reject.lock().unwrap().insert(bad.offline_id.clone());

        let outcome = reconciler.sync_transactions().await.unwrap();
        let RunOutcome::Completed(report) = outcome else {
            panic!("expected a completed cycle");
        };
        assert_eq!(report.sent, 2);
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 1);

        let ok = store.get(&ok.offline_id).await.unwrap().unwrap();
        assert!(ok.is_synced);
        assert!(ok.synced_at.is_some());

        let bad = store.get(&bad.offline_id).await.unwrap().unwrap();
        assert!(!bad.is_synced);
        assert_eq!(bad.attempts, 1);
        assert_eq!(
            bad.last_error.as_deref(),
            Some("Insufficient stock for product: Es Teh Manis")
        );

        // Order of the batch follows the queue.
        assert_eq!(stub.batches.lock().unwrap()[0][0], ok.offline_id);
    }

    #[tokio::test]
    async fn test_rejected_item_becomes_dead_letter() {
        let stub = Stub::default();
        let reconciler = reconciler_for(stub_server(stub.clone()).await, 2).await;
        let queued = reconciler.store().queue_offline(&cart()).await.unwrap();
        stub.reject.lock().unwrap().insert(queued.offline_id.clone());

        reconciler.sync_transactions().await.unwrap();
        let second = reconciler.sync_transactions().await.unwrap();
        assert!(matches!(second, RunOutcome::Completed(CycleReport { exhausted: 1, .. })));

        // Third cycle sends nothing; the item is only reported as skipped.
        assert_eq!(reconciler.sync_transactions().await.unwrap(), RunOutcome::Idle);
        assert_eq!(stub.batches.lock().unwrap().len(), 2);

        let counts = reconciler.store().counts(2).await.unwrap();
        assert_eq!(counts.dead_letters, 1);
        assert_eq!(counts.pending, 0);
    }

    #[tokio::test]
    async fn test_transport_failure_consumes_no_attempt() {
        async fn down() -> StatusCode {
            StatusCode::SERVICE_UNAVAILABLE
        }
        let base = serve(Router::new().route("/api/v1/sync", post(down))).await;
        let reconciler = reconciler_for(base, 10).await;
        let queued = reconciler.store().queue_offline(&cart()).await.unwrap();

        let err = reconciler.sync_transactions().await.unwrap_err();
        assert!(err.is_retryable());

        let row = reconciler.store().get(&queued.offline_id).await.unwrap().unwrap();
        assert_eq!(row.attempts, 0);
        assert!(!row.is_synced);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_busy() {
        let stub = Stub::default();
        let reconciler = reconciler_for(stub_server(stub).await, 10).await;

        let _held = reconciler.guard.lock().await;
        assert_eq!(reconciler.sync_transactions().await.unwrap(), RunOutcome::Busy);
    }

    #[tokio::test]
    async fn test_sync_products_fills_cache() {
        let stub = Stub::default();
        let reconciler = reconciler_for(stub_server(stub).await, 10).await;

        assert_eq!(reconciler.sync_products().await.unwrap(), 1);
        let cached = reconciler.store().products().await.unwrap();
        assert_eq!(cached[0].name, "Nasi Goreng Spesial");
        assert_eq!(cached[0].price, Money::from_rupiah(25_000));
    }
}
