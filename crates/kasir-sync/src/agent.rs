//! # Sync Agent
//!
//! Background task that decides *when* to reconcile. The reconciler decides
//! *what* to send.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncAgent Architecture                           │
//! │                                                                         │
//! │   startup ──► refresh products ──► sync transactions                    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     agent loop (tokio::select!)                  │  │
//! │  │                                                                  │  │
//! │  │   shutdown_rx ─────────────► stop                                │  │
//! │  │   interval (30s) ──────────┐                                     │  │
//! │  │   trigger_rx (online/now) ─┴─► Reconciler::sync_transactions     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  AgentStatus (RwLock) ──► SyncEventEmitter (UI notifications)           │
//! │                                                                         │
//! │  STATUS EVENTS:                                                        │
//! │  ──────────────                                                        │
//! │  emit_status   - connection state, counts, last sync                   │
//! │  emit_progress - { pending: 5, synced: 100 }                           │
//! │  emit_error    - { message: "Connection failed", retryable: true }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use kasir_core::checkout::CheckoutRequest;
use kasir_db::DbConfig;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::reconciler::{Reconciler, RunOutcome};
use crate::store::{LocalStore, QueuedTransaction};
use crate::transport::{HttpTransport, TransportConfig};

// =============================================================================
// Agent Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No request has been answered yet.
    Unknown,
    Online,
    Offline,
}

/// Snapshot of the agent for the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub connection: ConnectionState,

    /// Unsynced transactions still being retried.
    pub pending_count: i64,

    pub synced_count: i64,

    /// Unsynced transactions past the attempt limit.
    pub dead_letter_count: i64,

    /// Products in the local cache after the last refresh.
    pub cached_products: usize,

    /// Last cycle that got an answer from the server.
    pub last_sync: Option<DateTime<Utc>>,

    pub last_error: Option<String>,
}

impl Default for AgentStatus {
    fn default() -> Self {
        AgentStatus {
            connection: ConnectionState::Unknown,
            pending_count: 0,
            synced_count: 0,
            dead_letter_count: 0,
            cached_products: 0,
            last_sync: None,
            last_error: None,
        }
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives status changes, e.g. to forward them to a UI.
pub trait SyncEventEmitter: Send + Sync {
    fn emit_status(&self, status: &AgentStatus);

    fn emit_progress(&self, pending: i64, synced: i64);

    fn emit_error(&self, message: &str, retryable: bool);
}

pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &AgentStatus) {}
    fn emit_progress(&self, _pending: i64, _synced: i64) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Shared Agent State
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Trigger {
    /// Connectivity came back.
    Online,
    /// Explicit request from the caller.
    Manual,
}

/// State shared between the loop task and the handle.
struct AgentCore {
    reconciler: Reconciler,
    status: RwLock<AgentStatus>,
    emitter: Arc<dyn SyncEventEmitter>,
}

impl AgentCore {
    /// One transaction sync with status bookkeeping.
    async fn run_cycle(&self) -> SyncResult<RunOutcome> {
        let result = self.reconciler.sync_transactions().await;

        match &result {
            Ok(RunOutcome::Busy) => return result,
            Ok(RunOutcome::Idle) => {}
            Ok(RunOutcome::Completed(_)) => self.mark_online().await,
            Err(e) => self.record_error(e).await,
        }

        if let Err(e) = self.refresh_counts().await {
            warn!(error = %e, "Failed to read local queue counts");
        }

        let status = self.status.read().await.clone();
        self.emitter.emit_progress(status.pending_count, status.synced_count);
        self.emitter.emit_status(&status);

        result
    }

    async fn refresh_products(&self) -> SyncResult<usize> {
        match self.reconciler.sync_products().await {
            Ok(count) => {
                self.mark_online().await;
                self.status.write().await.cached_products = count;
                Ok(count)
            }
            Err(e) => {
                self.record_error(&e).await;
                Err(e)
            }
        }
    }

    /// Startup sequence: catalog first, then the queue.
    async fn startup(&self) {
        if let Err(e) = self.refresh_products().await {
            warn!(error = %e, "Initial product refresh failed");
        }
        if let Err(e) = self.run_cycle().await {
            warn!(error = %e, "Initial transaction sync failed");
        }
    }

    async fn refresh_counts(&self) -> SyncResult<()> {
        let counts = self
            .reconciler
            .store()
            .counts(self.reconciler.max_attempts())
            .await?;

        let mut status = self.status.write().await;
        status.pending_count = counts.pending;
        status.synced_count = counts.synced;
        status.dead_letter_count = counts.dead_letters;
        Ok(())
    }

    async fn mark_online(&self) {
        let mut status = self.status.write().await;
        status.connection = ConnectionState::Online;
        status.last_sync = Some(Utc::now());
        status.last_error = None;
    }

    async fn record_error(&self, error: &SyncError) {
        let retryable = error.is_retryable();
        warn!(error = %error, retryable, "Sync cycle failed");

        {
            let mut status = self.status.write().await;
            if retryable {
                status.connection = ConnectionState::Offline;
            }
            status.last_error = Some(error.to_string());
        }

        self.emitter.emit_error(&error.to_string(), retryable);
    }
}

// =============================================================================
// Sync Agent
// =============================================================================

pub struct SyncAgent {
    config: SyncConfig,
    core: Arc<AgentCore>,
}

impl SyncAgent {
    /// Opens the local store named by the config and builds the agent.
    pub async fn open(config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let store = LocalStore::open(DbConfig::new(config.local_db_path())).await?;
        Self::new(config, store)
    }

    pub fn new(config: SyncConfig, store: LocalStore) -> SyncResult<Self> {
        Self::with_emitter(config, store, Arc::new(NoOpEmitter))
    }

    pub fn with_emitter(
        config: SyncConfig,
        store: LocalStore,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> SyncResult<Self> {
        config.validate()?;

        let transport = HttpTransport::new(TransportConfig::from(&config))?;
        let core = AgentCore {
            reconciler: Reconciler::new(store, transport, &config),
            status: RwLock::new(AgentStatus::default()),
            emitter,
        };

        Ok(SyncAgent {
            config,
            core: Arc::new(core),
        })
    }

    /// Refreshes the catalog and sends one batch without starting the loop.
    pub async fn run_once(&self) -> SyncResult<RunOutcome> {
        if let Err(e) = self.core.refresh_products().await {
            warn!(error = %e, "Product refresh failed");
        }
        self.core.run_cycle().await
    }

    pub async fn status(&self) -> AgentStatus {
        self.core.status.read().await.clone()
    }

    /// Starts the background loop. The first sync runs right away.
    pub fn spawn(self) -> SyncAgentHandle {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        info!(
            device_id = %self.config.device_id(),
            server = %self.config.server.url,
            poll_secs = self.config.sync.poll_interval_secs,
            "Starting sync agent"
        );

        let task = tokio::spawn(Self::run(
            self.core.clone(),
            self.config.poll_interval(),
            trigger_rx,
            shutdown_rx,
        ));

        SyncAgentHandle {
            core: self.core,
            trigger_tx,
            shutdown_tx,
            task,
        }
    }

    async fn run(
        core: Arc<AgentCore>,
        period: Duration,
        mut trigger_rx: mpsc::Receiver<Trigger>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                info!("Sync agent stopped during startup");
                return;
            }
            _ = core.startup() => {}
        }

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Sync agent received shutdown");
                    break;
                }

                _ = interval.tick() => {
                    debug!("Interval sync");
                    let _ = core.run_cycle().await;
                }

                Some(trigger) = trigger_rx.recv() => {
                    match trigger {
                        Trigger::Online => info!("Connectivity restored, syncing"),
                        Trigger::Manual => debug!("Manual sync requested"),
                    }
                    let _ = core.run_cycle().await;
                }
            }
        }

        info!("Sync agent stopped");
    }
}

// =============================================================================
// Agent Handle
// =============================================================================

/// Controls a running agent.
pub struct SyncAgentHandle {
    core: Arc<AgentCore>,
    trigger_tx: mpsc::Sender<Trigger>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncAgentHandle {
    pub async fn status(&self) -> AgentStatus {
        self.core.status.read().await.clone()
    }

    /// Asks the loop to sync as soon as it is free.
    pub fn trigger_now(&self) -> SyncResult<()> {
        self.send_trigger(Trigger::Manual)
    }

    /// Tells the agent the network is reachable again.
    pub fn notify_online(&self) -> SyncResult<()> {
        self.send_trigger(Trigger::Online)
    }

    /// Runs a cycle on the caller's task and returns its outcome.
    pub async fn run_once(&self) -> SyncResult<RunOutcome> {
        self.core.run_cycle().await
    }

    /// Queues a sale made while offline. It is sent on the next cycle.
    pub async fn queue_sale(&self, request: &CheckoutRequest) -> SyncResult<QueuedTransaction> {
        let queued = self.core.reconciler.store().queue_offline(request).await?;
        self.core.refresh_counts().await?;
        Ok(queued)
    }

    /// Stops the loop and waits for it to exit. A cycle already in flight
    /// finishes first.
    pub async fn shutdown(self) -> SyncResult<()> {
        info!("Shutting down sync agent");

        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| SyncError::ChannelError(e.to_string()))?;

        self.core.reconciler.store().close().await;
        Ok(())
    }

    fn send_trigger(&self, trigger: Trigger) -> SyncResult<()> {
        match self.trigger_tx.try_send(trigger) {
            Ok(()) => Ok(()),
            // A trigger is already waiting; it covers this one.
            Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SyncError::ShuttingDown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use kasir_core::checkout::CheckoutItem;
    use kasir_core::sync::{BulkSyncRequest, SyncReport};
    use kasir_core::{Money, PaymentMethod};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Server {
        down: Arc<AtomicBool>,
        received: Arc<AtomicUsize>,
    }

    async fn sync(
        State(server): State<Server>,
        Json(batch): Json<BulkSyncRequest>,
    ) -> Result<Json<Value>, StatusCode> {
        if server.down.load(Ordering::SeqCst) {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        server.received.fetch_add(batch.transactions.len(), Ordering::SeqCst);

        let mut report = SyncReport::default();
        for tx in batch.transactions {
            report.succeeded(tx.id);
        }
        Ok(Json(json!({"success": true, "data": report})))
    }

    async fn products(State(server): State<Server>) -> Result<Json<Value>, StatusCode> {
        if server.down.load(Ordering::SeqCst) {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        Ok(Json(json!({"success": true, "data": []})))
    }

    async fn start_server(server: Server) -> String {
        let app = Router::new()
            .route("/api/v1/sync", post(sync))
            .route("/api/v1/products", get(products))
            .with_state(server);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v1")
    }

    fn config_for(url: String) -> SyncConfig {
        let mut config = SyncConfig::new();
        config.server.url = url;
        config.sync.poll_interval_secs = 3600;
        config.sync.initial_backoff_ms = 10;
        config.sync.max_elapsed_secs = 0;
        config
    }

    fn cart() -> CheckoutRequest {
        CheckoutRequest {
            payment_method: PaymentMethod::Qris,
            items: vec![CheckoutItem {
                product_id: "p1".into(),
                quantity: 2,
                price_at_record: Money::from_rupiah(24_000),
            }],
        }
    }

    #[derive(Default)]
    struct RecordingEmitter {
        errors: Mutex<Vec<(String, bool)>>,
        progress: Mutex<Vec<(i64, i64)>>,
    }

    impl SyncEventEmitter for RecordingEmitter {
        fn emit_status(&self, _status: &AgentStatus) {}

        fn emit_progress(&self, pending: i64, synced: i64) {
            self.progress.lock().unwrap().push((pending, synced));
        }

        fn emit_error(&self, message: &str, retryable: bool) {
            self.errors.lock().unwrap().push((message.to_string(), retryable));
        }
    }

    async fn wait_for<F>(handle: &SyncAgentHandle, check: F) -> AgentStatus
    where
        F: Fn(&AgentStatus) -> bool,
    {
        for _ in 0..200 {
            let status = handle.status().await;
            if check(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("agent status never reached the expected state");
    }

    #[test]
    fn test_agent_status_default() {
        let status = AgentStatus::default();
        assert_eq!(status.connection, ConnectionState::Unknown);
        assert_eq!(status.pending_count, 0);
        assert!(status.last_sync.is_none());
    }

    #[tokio::test]
    async fn test_startup_syncs_queued_sales() {
        let server = Server::default();
        let url = start_server(server.clone()).await;

        let store = LocalStore::in_memory().await.unwrap();
        store.queue_offline(&cart()).await.unwrap();
        store.queue_offline(&cart()).await.unwrap();

        let handle = SyncAgent::new(config_for(url), store).unwrap().spawn();
        let status = wait_for(&handle, |s| s.synced_count == 2).await;

        assert_eq!(status.connection, ConnectionState::Online);
        assert_eq!(status.pending_count, 0);
        assert_eq!(server.received.load(Ordering::SeqCst), 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_now_sends_new_sale() {
        let server = Server::default();
        let url = start_server(server.clone()).await;

        let store = LocalStore::in_memory().await.unwrap();
        let handle = SyncAgent::new(config_for(url), store).unwrap().spawn();
        wait_for(&handle, |s| s.connection == ConnectionState::Online).await;

        let queued = handle.queue_sale(&cart()).await.unwrap();
        assert_eq!(queued.total_amount, Money::from_rupiah(48_000));

        handle.trigger_now().unwrap();
        wait_for(&handle, |s| s.synced_count == 1).await;

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_server_down_keeps_queue_and_reports_offline() {
        let server = Server::default();
        server.down.store(true, Ordering::SeqCst);
        let url = start_server(server.clone()).await;

        let store = LocalStore::in_memory().await.unwrap();
        store.queue_offline(&cart()).await.unwrap();

        let emitter = Arc::new(RecordingEmitter::default());
        let handle = SyncAgent::with_emitter(config_for(url), store, emitter.clone())
            .unwrap()
            .spawn();

        // Startup reports two failures: the catalog refresh and the first cycle.
        for _ in 0..200 {
            if emitter.errors.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let status = handle.status().await;
        assert_eq!(status.connection, ConnectionState::Offline);
        assert!(status.last_error.is_some());

        let err = handle.run_once().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(handle.status().await.pending_count, 1);
        assert!(emitter.errors.lock().unwrap().iter().all(|(_, retryable)| *retryable));

        // Connectivity comes back.
        server.down.store(false, Ordering::SeqCst);
        handle.notify_online().unwrap();
        let status = wait_for(&handle, |s| s.synced_count == 1).await;
        assert_eq!(status.connection, ConnectionState::Online);
        assert!(status.last_error.is_none());

        handle.shutdown().await.unwrap();
        assert!(emitter.progress.lock().unwrap().contains(&(0, 1)));
    }

    #[tokio::test]
    async fn test_run_once_without_loop() {
        let server = Server::default();
        let url = start_server(server.clone()).await;

        let store = LocalStore::in_memory().await.unwrap();
        store.queue_offline(&cart()).await.unwrap();

        let agent = SyncAgent::new(config_for(url), store).unwrap();
        let outcome = agent.run_once().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(ref r) if r.synced == 1));
        assert_eq!(agent.status().await.synced_count, 1);

        assert_eq!(agent.run_once().await.unwrap(), RunOutcome::Idle);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = SyncConfig::new();
        config.server.url = "ftp://example.com".into();
        let store = LocalStore::in_memory().await.unwrap();

        let err = SyncAgent::new(config, store).err().unwrap();
        assert!(err.is_config_error());
    }
}
