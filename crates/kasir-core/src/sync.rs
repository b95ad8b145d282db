//! # Offline Sync Wire Types
//!
//! Request and response of `POST /sync`, shared by the server and the
//! client reconciler.
//!
//! ```text
//! {"transactions": [{"id": "<offline uuid>",
//!                    "data": {"paymentMethod": "CASH", "items": [...]},
//!                    "createdAt": "2026-01-02T03:04:05Z"}]}
//!      │
//!      ▼
//! {"success": ["<id>", ...], "failed": [{"id": "<id>", "error": "..."}]}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::checkout::CheckoutRequest;
use crate::validation::{validate_id, ValidationResult};

/// One transaction recorded while offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncTransaction {
    /// Client-generated id; becomes the server transaction id and is the
    /// idempotency key for replays.
    pub id: String,
    pub data: CheckoutRequest,
    /// When the sale happened on the device.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SyncTransaction {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("id", &self.id)?;
        self.data.validate()
    }
}

/// Body of `POST /sync`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkSyncRequest {
    pub transactions: Vec<SyncTransaction>,
}

/// A rejected item of a sync batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncFailure {
    pub id: String,
    pub error: String,
}

/// Per-item outcome of a sync batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncReport {
    pub success: Vec<String>,
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn succeeded(&mut self, id: impl Into<String>) {
        self.success.push(id.into());
    }

    pub fn failed(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.failed.push(SyncFailure {
            id: id.into(),
            error: error.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
