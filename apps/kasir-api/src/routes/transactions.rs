use std::sync::Arc;

use axum::extract::State;

use kasir_core::TransactionHistory;

use super::{ok, Envelope};
use crate::auth::AuthenticatedCashier;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/v1/transactions - the caller's own sales, newest first
pub async fn history(
    State(state): State<Arc<AppState>>,
    cashier: AuthenticatedCashier,
) -> ApiResult<Envelope<Vec<TransactionHistory>>> {
    let history = state.db.transactions().history(&cashier.id).await?;
    Ok(ok(history))
}
