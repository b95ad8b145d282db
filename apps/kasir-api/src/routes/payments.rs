//! Payment gateway callback.
//!
//! ```text
//! notification ──► signature ok? ──no──► 401
//!                      │yes
//!                      ▼
//!              transaction known? ──no──► 404
//!                      │yes
//!                      ▼
//!              map_gateway_status ──None──► ack
//!                      │Some(next)
//!                      ▼
//!              update_status (PENDING only) ──► ack
//! ```

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;
use tracing::{debug, info, warn};

use kasir_core::payment::{map_gateway_status, verify_signature, GatewayNotification};
use kasir_db::StatusChange;

use super::{ok, Envelope};
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Acknowledged {
    pub received: bool,
}

/// POST /api/v1/payments/notification (also /payments/midtrans/notification)
///
/// Authenticated by the notification signature, not a bearer token.
pub async fn notification(
    State(state): State<Arc<AppState>>,
    ValidJson(notification): ValidJson<GatewayNotification>,
) -> ApiResult<Envelope<Acknowledged>> {
    let server_key = &state.config.midtrans.server_key;
    if server_key.is_empty() || !verify_signature(&notification, server_key) {
        warn!(order_id = %notification.order_id, "Rejected notification with bad signature");
        return Err(ApiError::Unauthorized("Invalid signature".to_string()));
    }

    let transactions = state.db.transactions();
    if !transactions.exists(&notification.order_id).await? {
        return Err(ApiError::NotFound("Transaction not found".to_string()));
    }

    let Some(next) = map_gateway_status(
        &notification.transaction_status,
        notification.fraud_status.as_deref(),
    ) else {
        debug!(
            order_id = %notification.order_id,
            status = %notification.transaction_status,
            fraud = ?notification.fraud_status,
            "Notification carries no status change"
        );
        return Ok(ok(Acknowledged { received: true }));
    };

    match transactions
        .update_status(
            &notification.order_id,
            next,
            notification.transaction_id.as_deref(),
        )
        .await?
    {
        StatusChange::Applied(tx) => {
            info!(order_id = %tx.id, status = %tx.status, "Payment status applied");
        }
        StatusChange::Unchanged(tx) => {
            debug!(order_id = %tx.id, status = %tx.status, requested = %next, "Payment status unchanged");
        }
    }

    Ok(ok(Acknowledged { received: true }))
}
