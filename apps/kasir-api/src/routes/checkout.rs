//! Online checkout.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::warn;

use kasir_core::checkout::CheckoutRequest;
use kasir_core::payment::{CustomerDetails, PaymentSession};
use kasir_core::{PaymentMethod, TransactionWithItems};

use super::{created, Envelope};
use crate::auth::AuthenticatedCashier;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::AppState;

/// CASH answers with the transaction itself; CARD and QRIS also carry
/// the payment session the client opens.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    Settled(TransactionWithItems),
    AwaitingPayment {
        transaction: TransactionWithItems,
        payment: PaymentSession,
    },
}

/// POST /api/v1/checkout (also POST /api/v1/transactions)
pub async fn create(
    State(state): State<Arc<AppState>>,
    cashier: AuthenticatedCashier,
    ValidJson(request): ValidJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Envelope<CheckoutResponse>)> {
    request.validate()?;

    let recorded = state.db.transactions().checkout(&cashier.id, &request).await?;

    if request.payment_method == PaymentMethod::Cash {
        return Ok(created(CheckoutResponse::Settled(recorded)));
    }

    let customer = CustomerDetails {
        name: cashier.name,
        email: cashier.email,
    };

    let payment = state
        .gateway
        .create_payment_session(
            &recorded.transaction.id,
            recorded.transaction.total_amount,
            &customer,
        )
        .await
        .map_err(|e| {
            warn!(id = %recorded.transaction.id, error = %e, "Payment session not created");
            ApiError::PaymentGateway("Failed to initialize payment gateway".to_string())
        })?;

    Ok(created(CheckoutResponse::AwaitingPayment {
        transaction: recorded,
        payment,
    }))
}
