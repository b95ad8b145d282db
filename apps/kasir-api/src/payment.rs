//! # Payment Gateway
//!
//! Opens Snap payment sessions for CARD and QRIS checkouts. The inbound
//! half (notification signature and status mapping) lives in
//! `kasir_core::payment`.
//!
//! ```text
//! checkout (non-cash, committed as PENDING)
//!      │
//!      ▼
//! PaymentGateway::create_payment_session(order_id, amount, customer)
//!      │
//!      ├── Ok  ──► 201 {transaction, payment: {token, redirect_url}}
//!      └── Err ──► 502 PAYMENT_GATEWAY_ERROR (transaction stays PENDING)
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use kasir_core::payment::{CustomerDetails, PaymentSession};
use kasir_core::Money;

use crate::config::MidtransConfig;

const SNAP_TRANSACTIONS_PATH: &str = "/snap/v1/transactions";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    #[error("Gateway answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Something that can open a payment session for a pending transaction.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_session(
        &self,
        transaction_id: &str,
        amount: Money,
        customer: &CustomerDetails,
    ) -> Result<PaymentSession, GatewayError>;
}

// =============================================================================
// Midtrans Snap
// =============================================================================

#[derive(Serialize)]
struct SnapRequest<'a> {
    transaction_details: TransactionDetails<'a>,
    customer_details: SnapCustomer<'a>,
    credit_card: CreditCard,
}

#[derive(Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Serialize)]
struct SnapCustomer<'a> {
    first_name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct CreditCard {
    secure: bool,
}

/// Snap API client authenticated with the server key.
pub struct MidtransGateway {
    http: Client,
    base_url: String,
    server_key: String,
}

impl MidtransGateway {
    pub fn new(config: &MidtransConfig) -> Result<Self, GatewayError> {
        Self::with_base_url(config, config.base_url())
    }

    /// Same client pointed at another host (a stub in tests).
    pub fn with_base_url(config: &MidtransConfig, base_url: &str) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        Ok(MidtransGateway {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            server_key: config.server_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    async fn create_payment_session(
        &self,
        transaction_id: &str,
        amount: Money,
        customer: &CustomerDetails,
    ) -> Result<PaymentSession, GatewayError> {
        let body = SnapRequest {
            transaction_details: TransactionDetails {
                order_id: transaction_id,
                gross_amount: amount.rupiah(),
            },
            customer_details: SnapCustomer {
                first_name: &customer.name,
                email: &customer.email,
            },
            credit_card: CreditCard { secure: true },
        };

        debug!(order_id = %transaction_id, amount = %amount, "Creating Snap transaction");

        let response = self
            .http
            .post(format!("{}{}", self.base_url, SNAP_TRANSACTIONS_PATH))
            .basic_auth(&self.server_key, Some(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<PaymentSession>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}
