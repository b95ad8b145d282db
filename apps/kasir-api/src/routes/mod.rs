//! # HTTP Routes
//!
//! ```text
//! /api/v1
//! ├── POST   /checkout                         bearer     checkout::create
//! ├── GET    /transactions                     bearer     transactions::history
//! ├── POST   /transactions                     bearer     checkout::create
//! ├── POST   /sync                             bearer     sync::bulk_sync
//! ├── GET    /sync/logs                        bearer     sync::logs
//! ├── POST   /payments/notification            signature  payments::notification
//! ├── POST   /payments/midtrans/notification   signature  payments::notification
//! ├── GET    /products                         -          products::list
//! ├── POST   /products                         bearer     products::create
//! ├── GET    /products/{id}                    -          products::get
//! ├── PATCH  /products/{id}                    bearer     products::update
//! ├── DELETE /products/{id}                    bearer     products::delete
//! ├── GET    /categories                       -          categories::list
//! ├── POST   /categories                       bearer     categories::create
//! ├── GET    /reports?type=                    -          reports::get
//! └── GET    /health                           -          health::check
//! ```

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use kasir_core::envelope::ApiEnvelope;

use crate::error::ApiError;
use crate::AppState;

pub mod categories;
pub mod checkout;
pub mod health;
pub mod payments;
pub mod products;
pub mod reports;
pub mod sync;
pub mod transactions;

/// Every route under `/api/v1`.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checkout", post(checkout::create))
        .route(
            "/transactions",
            get(transactions::history).post(checkout::create),
        )
        .route("/sync", post(sync::bulk_sync))
        .route("/sync/logs", get(sync::logs))
        .route("/payments/notification", post(payments::notification))
        .route(
            "/payments/midtrans/notification",
            post(payments::notification),
        )
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get)
                .patch(products::update)
                .delete(products::delete),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route("/reports", get(reports::get))
        .route("/health", get(health::check))
}

pub(crate) type Envelope<T> = Json<ApiEnvelope<T>>;

pub(crate) fn ok<T: Serialize>(data: T) -> Envelope<T> {
    Json(ApiEnvelope::ok(data))
}

pub(crate) fn created<T: Serialize>(data: T) -> (StatusCode, Envelope<T>) {
    (StatusCode::CREATED, Json(ApiEnvelope::ok(data)))
}

/// Unknown paths answer with the error envelope too.
pub(crate) async fn fallback() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
