//! # Payment Gateway Rules
//!
//! The gateway-independent half of the payment bridge: verifying a
//! notification and deciding what it means for the transaction.
//!
//! ## Notification Flow
//! ```text
//! POST /payments/notification
//!      │
//!      ▼
//! verify_signature()  ── mismatch ──► 401, nothing changes
//!      │
//!      ▼
//! map_gateway_status(transaction_status, fraud_status)
//!      │
//!      ├── None ────────────────────► acknowledged, nothing changes
//!      ▼
//! TransactionStatus::can_transition_to() ── no ──► acknowledged, nothing changes
//!      │
//!      ▼
//! status + midtrans_id updated
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use ts_rs::TS;

use crate::types::TransactionStatus;

/// Webhook body posted by the gateway. Field names follow the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Buyer details sent when opening a payment session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
}

/// Session handed back to the cashier UI for non-cash checkouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSession {
    pub token: String,
    pub redirect_url: String,
}

/// Lowercase hex SHA-512 of `order_id + status_code + gross_amount + server_key`.
pub fn compute_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Exact, case-sensitive comparison against the notification's signature.
pub fn verify_signature(notification: &GatewayNotification, server_key: &str) -> bool {
    let expected = compute_signature(
        &notification.order_id,
        &notification.status_code,
        &notification.gross_amount,
        server_key,
    );
    expected == notification.signature_key
}

/// Maps the gateway's status vocabulary onto [`TransactionStatus`].
///
/// | gateway                  | result    |
/// |--------------------------|-----------|
/// | capture + fraud=accept   | PAID      |
/// | capture + other fraud    | no change |
/// | settlement               | PAID      |
/// | cancel / deny / expire   | CANCELLED |
/// | pending                  | PENDING   |
/// | anything else            | no change |
pub fn map_gateway_status(
    transaction_status: &str,
    fraud_status: Option<&str>,
) -> Option<TransactionStatus> {
    match transaction_status {
        "capture" if fraud_status == Some("accept") => Some(TransactionStatus::Paid),
        "capture" => None,
        "settlement" => Some(TransactionStatus::Paid),
        "cancel" | "deny" | "expire" => Some(TransactionStatus::Cancelled),
        "pending" => Some(TransactionStatus::Pending),
        _ => None,
    }
}
