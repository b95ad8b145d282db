//! # Report Repository
//!
//! Read-only aggregates behind `GET /reports`.
//!
//! Timestamps are stored as RFC 3339 text in UTC, so range filters compare
//! strings and still order correctly.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use kasir_core::report::{ReportPeriod, SalesReport, TopProduct};
use kasir_core::Money;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Revenue, transaction count and units sold over PAID transactions
    /// created inside `period` (both ends inclusive).
    pub async fn sales_summary(&self, period: &ReportPeriod) -> DbResult<SalesReport> {
        debug!(start = %period.start, end = %period.end, "Computing sales summary");

        let (revenue, transaction_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
            FROM transactions
            WHERE status = 'PAID' AND created_at >= ?1 AND created_at <= ?2
            "#,
        )
        .bind(period.start)
        .bind(period.end)
        .fetch_one(&self.pool)
        .await?;

        let item_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ti.quantity), 0)
            FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            WHERE t.status = 'PAID' AND t.created_at >= ?1 AND t.created_at <= ?2
            "#,
        )
        .bind(period.start)
        .bind(period.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesReport {
            revenue: Money::from_rupiah(revenue),
            transaction_count,
            item_count,
            period: *period,
        })
    }

    /// Best sellers by summed quantity across all recorded items.
    pub async fn top_products(&self, limit: i64) -> DbResult<Vec<TopProduct>> {
        let rows: Vec<TopProduct> = sqlx::query_as(
            r#"
            SELECT p.name, p.sku, SUM(ti.quantity) AS total_sold
            FROM transaction_items ti
            JOIN products p ON p.id = ti.product_id
            GROUP BY p.id
            ORDER BY total_sold DESC, p.name ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::seeded_db;
    use chrono::{Duration, TimeZone, Utc};
    use kasir_core::checkout::{CheckoutItem, CheckoutRequest};
    use kasir_core::sync::SyncTransaction;
    use kasir_core::PaymentMethod;

    fn request(method: PaymentMethod, product_id: &str, quantity: i64, price: i64) -> CheckoutRequest {
        CheckoutRequest {
            payment_method: method,
            items: vec![CheckoutItem {
                product_id: product_id.to_string(),
                quantity,
                price_at_record: Money::from_rupiah(price),
            }],
        }
    }

    #[tokio::test]
    async fn test_sales_summary_counts_paid_only_within_period() {
        let (db, f) = seeded_db().await;
        let repo = db.transactions();

        repo.checkout("c1", &request(PaymentMethod::Cash, &f.nasi, 2, 24_000))
            .await
            .unwrap();
        repo.checkout("c1", &request(PaymentMethod::Qris, &f.teh, 3, 5_000))
            .await
            .unwrap();
        let old = SyncTransaction {
            id: "offline-old".to_string(),
            data: request(PaymentMethod::Cash, &f.teh, 1, 5_000),
            created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        };
        repo.apply_synced("c1", &old).await.unwrap();

        let now = Utc::now();
        let period = ReportPeriod {
            start: now - Duration::hours(1),
            end: now + Duration::hours(1),
        };
        let report = db.reports().sales_summary(&period).await.unwrap();

        assert_eq!(report.revenue, Money::from_rupiah(48_000));
        assert_eq!(report.transaction_count, 1);
        assert_eq!(report.item_count, 2);
    }

    #[tokio::test]
    async fn test_top_products_include_every_status() {
        let (db, f) = seeded_db().await;
        let repo = db.transactions();

        repo.checkout("c1", &request(PaymentMethod::Qris, &f.teh, 3, 5_000))
            .await
            .unwrap();
        repo.checkout("c1", &request(PaymentMethod::Cash, &f.nasi, 2, 25_000))
            .await
            .unwrap();
        repo.checkout("c1", &request(PaymentMethod::Cash, &f.teh, 1, 5_000))
            .await
            .unwrap();

        let top = db.reports().top_products(5).await.unwrap();
        assert_eq!(
            top,
            vec![
                TopProduct {
                    name: "Es Teh Manis".to_string(),
                    sku: "DRINK-001".to_string(),
                    total_sold: 4,
                },
                TopProduct {
                    name: "Nasi Goreng Spesial".to_string(),
                    sku: "FOOD-001".to_string(),
                    total_sold: 2,
                },
            ]
        );
        assert_eq!(db.reports().top_products(1).await.unwrap().len(), 1);
    }
}
