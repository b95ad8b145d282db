//! # Kasir API
//!
//! HTTP server in front of the authoritative store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Kasir API Server                              │
//! │                                                                         │
//! │  POS client ──► axum (/api/v1) ──► routes ──► kasir-db ──► SQLite      │
//! │  kasir-agent ─► POST /sync ─────────┘   │                               │
//! │                                         ▼                               │
//! │  Midtrans ◄── Snap session ◄──── PaymentGateway                        │
//! │  Midtrans ──► POST /payments/notification ──► status state machine     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`routes`] - Handlers and the route table
//! - [`auth`] - Bearer token verification
//! - [`payment`] - Payment gateway client
//! - [`config`] - Environment configuration
//! - [`error`] - Error envelope mapping

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod payment;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use kasir_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::payment::PaymentGateway;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
    pub jwt: JwtManager,
    pub gateway: Arc<dyn PaymentGateway>,
}

/// Full application router, every route nested under `/api/v1`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(routes::fallback)
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Kasir API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
