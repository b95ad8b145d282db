//! # Sales Reports
//!
//! Report kinds served by `GET /reports?type=` and the period boundaries
//! they cover. Periods are computed from the caller's local clock and
//! stored as UTC instants; the aggregation itself runs in kasir-db.

use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Report Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportKind {
    #[default]
    Daily,
    Monthly,
    TopProducts,
}

impl FromStr for ReportKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ReportKind::Daily),
            "monthly" => Ok(ReportKind::Monthly),
            "top-products" => Ok(ReportKind::TopProducts),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec![
                    "daily".to_string(),
                    "monthly".to_string(),
                    "top-products".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Report Period
// =============================================================================

/// Inclusive `[start, end]` window, end being the last millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportPeriod {
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl ReportPeriod {
    /// The local calendar day containing `now`.
    pub fn daily<Tz: TimeZone>(now: &DateTime<Tz>) -> CoreResult<Self> {
        let tz = now.timezone();
        let today = now.date_naive();
        let tomorrow = today
            .succ_opt()
            .ok_or_else(|| CoreError::InvalidPeriod(format!("no day after {today}")))?;
        Self::between(&tz, today, tomorrow)
    }

    /// The local calendar month containing `now`.
    pub fn monthly<Tz: TimeZone>(now: &DateTime<Tz>) -> CoreResult<Self> {
        let tz = now.timezone();
        let today = now.date_naive();
        let first = today
            .with_day0(0)
            .ok_or_else(|| CoreError::InvalidPeriod(format!("no first day for {today}")))?;
        let next_first = first
            .checked_add_months(chrono::Months::new(1))
            .ok_or_else(|| CoreError::InvalidPeriod(format!("no month after {first}")))?;
        Self::between(&tz, first, next_first)
    }

    fn between<Tz: TimeZone>(tz: &Tz, first: NaiveDate, next: NaiveDate) -> CoreResult<Self> {
        let start = local_midnight(tz, first)?;
        let end = local_midnight(tz, next)? - Duration::milliseconds(1);
        Ok(ReportPeriod { start, end })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> CoreResult<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::InvalidPeriod(format!("{date} has no local midnight")))
}

// =============================================================================
// Report Payloads
// =============================================================================

/// Revenue summary over PAID transactions in a period.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub revenue: Money,
    pub transaction_count: i64,
    pub item_count: i64,
    pub period: ReportPeriod,
}

/// Best seller row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub name: String,
    pub sku: String,
    pub total_sold: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn jakarta() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("daily".parse::<ReportKind>().unwrap(), ReportKind::Daily);
        assert_eq!("monthly".parse::<ReportKind>().unwrap(), ReportKind::Monthly);
        assert_eq!(
            "top-products".parse::<ReportKind>().unwrap(),
            ReportKind::TopProducts
        );
        assert!("weekly".parse::<ReportKind>().is_err());
        assert_eq!(ReportKind::default(), ReportKind::Daily);
    }

    #[test]
    fn test_daily_period_in_local_time() {
        let now = jakarta().with_ymd_and_hms(2026, 3, 15, 1, 30, 0).unwrap();
        let period = ReportPeriod::daily(&now).unwrap();

        assert_eq!(period.start.to_rfc3339(), "2026-03-14T17:00:00+00:00");
        assert_eq!(
            period.end,
            Utc.with_ymd_and_hms(2026, 3, 15, 16, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert!(period.contains(now.with_timezone(&Utc)));
    }

    #[test]
    fn test_monthly_period_wraps_year() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 23, 0, 0).unwrap();
        let period = ReportPeriod::monthly(&now).unwrap();

        assert_eq!(period.start, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(
            period.end + Duration::milliseconds(1),
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
        assert!(!period.contains(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_sales_report_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let report = SalesReport {
            revenue: Money::from_rupiah(48_000),
            transaction_count: 1,
            item_count: 2,
            period: ReportPeriod::daily(&now).unwrap(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["revenue"], 48_000);
        assert_eq!(json["transactionCount"], 1);
        assert_eq!(json["itemCount"], 2);
        assert!(json["period"]["start"].is_string());
    }
}
