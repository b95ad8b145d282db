//! Offline batch replay and its audit trail.

use std::sync::Arc;

use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::{error, info, warn};

use kasir_core::sync::{BulkSyncRequest, SyncReport};
use kasir_core::{SyncLog, SyncLogStatus};
use kasir_db::{ApplyOutcome, DbError};

use super::{ok, Envelope};
use crate::auth::AuthenticatedCashier;
use crate::error::ApiResult;
use crate::extract::ValidJson;
use crate::AppState;

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 200;

/// POST /api/v1/sync
///
/// Every item is applied on its own; a rejected item never blocks the
/// rest of the batch. Ids that are already stored count as success.
pub async fn bulk_sync(
    State(state): State<Arc<AppState>>,
    cashier: AuthenticatedCashier,
    ValidJson(batch): ValidJson<BulkSyncRequest>,
) -> ApiResult<Envelope<SyncReport>> {
    let transactions = state.db.transactions();
    let mut report = SyncReport::default();

    for item in &batch.transactions {
        if let Err(e) = item.validate() {
            report.failed(&item.id, e.to_string());
            continue;
        }

        match transactions.apply_synced(&cashier.id, item).await {
            Ok(ApplyOutcome::Applied(_)) | Ok(ApplyOutcome::AlreadyApplied) => {
                report.succeeded(&item.id);
            }
            Err(e) => report.failed(&item.id, failure_message(&item.id, e)),
        }
    }

    record_audit(&state, &report).await;

    info!(
        cashier = %cashier.id,
        received = batch.transactions.len(),
        succeeded = report.success.len(),
        failed = report.failed.len(),
        "Sync batch processed"
    );

    Ok(ok(report))
}

/// Text stored in the report and the audit log for an item that failed.
///
/// Rejections the cashier can act on keep their message; storage faults
/// are logged here and reported generically.
fn failure_message(item_id: &str, err: DbError) -> String {
    match err {
        DbError::Business(_)
        | DbError::NotFound { .. }
        | DbError::UniqueViolation { .. }
        | DbError::ForeignKeyViolation { .. } => err.to_string(),
        other => {
            error!(id = %item_id, error = %other, "Offline transaction failed to apply");
            "An unexpected error occurred".to_string()
        }
    }
}

/// Audit entries are best effort; the batch has already been applied.
async fn record_audit(state: &AppState, report: &SyncReport) {
    let logs = state.db.sync_logs();

    for failure in &report.failed {
        let details = format!("Transaction {} failed: {}", failure.id, failure.error);
        if let Err(e) = logs.append(SyncLogStatus::Failed, details).await {
            warn!(error = %e, "Failed to write sync log");
        }
    }

    if !report.success.is_empty() {
        let details = format!("Successfully synced {} transactions.", report.success.len());
        if let Err(e) = logs.append(SyncLogStatus::Success, details).await {
            warn!(error = %e, "Failed to write sync log");
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/sync/logs?limit= - newest audit entries first
pub async fn logs(
    State(state): State<Arc<AppState>>,
    _cashier: AuthenticatedCashier,
    Query(query): Query<LogQuery>,
) -> ApiResult<Envelope<Vec<SyncLog>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);

    let entries = state.db.sync_logs().recent(limit).await?;
    Ok(ok(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_core::CoreError;

    #[test]
    fn test_storage_faults_are_reported_generically() {
        let message = failure_message(
            "offline-1",
            DbError::QueryFailed("disk I/O error: /var/lib/kasir/kasir.db".to_string()),
        );

        assert_eq!(message, "An unexpected error occurred");
    }

    #[test]
    fn test_business_rejections_keep_their_message() {
        let message = failure_message(
            "offline-2",
            DbError::Business(CoreError::InsufficientStock {
                product: "Nasi Goreng Spesial".to_string(),
                available: 1,
                requested: 3,
            }),
        );

        assert_eq!(message, "Insufficient stock for product: Nasi Goreng Spesial");
    }
}
