//! # kasir-sync: Offline Sync Client for Kasir POS
//!
//! Lets a cashier device keep selling while the server is unreachable.
//! Sales made offline go into a local SQLite queue and are replayed to
//! `POST /sync` once the server answers again. Each queued sale carries a
//! client-generated id, so replaying a batch twice never records a sale
//! twice.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Client Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    SyncAgent (background task)                   │  │
//! │  │   startup • every poll_interval_secs • notify_online • trigger   │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         Reconciler                               │  │
//! │  │   one cycle at a time, per-item success/failure bookkeeping      │  │
//! │  └──────────────┬────────────────────────────────────┬──────────────┘  │
//! │                 ▼                                    ▼                  │
//! │  ┌──────────────────────────────┐   ┌──────────────────────────────┐   │
//! │  │ LocalStore (SQLite)          │   │ HttpTransport (reqwest)      │   │
//! │  │ local_transactions queue     │   │ POST /sync, GET /products    │   │
//! │  │ local_products cache         │   │ exponential backoff          │   │
//! │  └──────────────────────────────┘   └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`agent`] - `SyncAgent` loop and its handle
//! - [`reconciler`] - One sync cycle and the product cache refresh
//! - [`store`] - Local queue and product cache
//! - [`transport`] - HTTP client for the Kasir API
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_sync::{SyncAgent, SyncConfig};
//!
//! let config = SyncConfig::load(None)?;
//! let handle = SyncAgent::open(config).await?.spawn();
//!
//! // Network came back
//! handle.notify_online()?;
//!
//! let status = handle.status().await;
//! println!("pending: {}", status.pending_count);
//!
//! handle.shutdown().await?;
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod store;
pub mod transport;

pub use agent::{
    AgentStatus, ConnectionState, NoOpEmitter, SyncAgent, SyncAgentHandle, SyncEventEmitter,
};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use reconciler::{CycleReport, Reconciler, RunOutcome};
pub use store::{CachedProduct, LocalStore, QueueCounts, QueuedTransaction};
pub use transport::{HttpTransport, TransportConfig};
