//! Sales summaries for the back office.

use std::sync::Arc;

use axum::extract::{Query, State};
use chrono::Local;
use serde::{Deserialize, Serialize};

use kasir_core::report::{ReportKind, ReportPeriod, SalesReport, TopProduct};
use kasir_core::TOP_PRODUCTS_LIMIT;

use super::{ok, Envelope};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Sales(SalesReport),
    TopProducts(Vec<TopProduct>),
}

/// GET /api/v1/reports?type=daily|monthly|top-products
///
/// Day and month boundaries follow the server's local clock.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Envelope<Report>> {
    let kind = match query.kind.as_deref() {
        None => ReportKind::default(),
        Some(raw) => raw
            .parse::<ReportKind>()
            .map_err(|_| ApiError::validation("Invalid report type"))?,
    };

    let reports = state.db.reports();
    let now = Local::now();

    let report = match kind {
        ReportKind::Daily => {
            Report::Sales(reports.sales_summary(&ReportPeriod::daily(&now)?).await?)
        }
        ReportKind::Monthly => {
            Report::Sales(reports.sales_summary(&ReportPeriod::monthly(&now)?).await?)
        }
        ReportKind::TopProducts => {
            Report::TopProducts(reports.top_products(TOP_PRODUCTS_LIMIT).await?)
        }
    };

    Ok(ok(report))
}
