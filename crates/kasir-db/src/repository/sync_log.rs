//! # Sync Log Repository
//!
//! Append-only audit of offline sync batches.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use kasir_core::{SyncLog, SyncLogStatus};

#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    pool: SqlitePool,
}

impl SyncLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SyncLogRepository { pool }
    }

    pub async fn append(&self, status: SyncLogStatus, details: impl Into<String>) -> DbResult<SyncLog> {
        let entry = SyncLog {
            id: Uuid::new_v4().to_string(),
            status,
            details: details.into(),
            created_at: Utc::now(),
        };

        debug!(status = ?entry.status, details = %entry.details, "Appending sync log");

        sqlx::query("INSERT INTO sync_logs (id, status, details, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&entry.id)
            .bind(entry.status)
            .bind(&entry.details)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;

        Ok(entry)
    }

    /// Most recent entries first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<SyncLog>> {
        let entries: Vec<SyncLog> = sqlx::query_as(
            "SELECT id, status, details, created_at FROM sync_logs \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use kasir_core::SyncLogStatus;

    #[tokio::test]
    async fn test_append_and_recent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let logs = db.sync_logs();

        logs.append(SyncLogStatus::Failed, "Transaction t1 failed: Product with ID p1 not found")
            .await
            .unwrap();
        logs.append(SyncLogStatus::Success, "Successfully synced 2 transactions.")
            .await
            .unwrap();

        let recent = logs.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].status, SyncLogStatus::Success);
        assert_eq!(recent[1].details, "Transaction t1 failed: Product with ID p1 not found");

        assert_eq!(logs.recent(1).await.unwrap().len(), 1);
    }
}
