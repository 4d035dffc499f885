//! HTTP handlers
//!
//! Handlers check permissions, pick the service and wrap results in the
//! `ApiResponse` envelope. Business rules live in the services.

pub mod activity_log;
pub mod adjustment;
pub mod auth;
pub mod category;
pub mod health;
pub mod material;
pub mod reporting;
pub mod role;
pub mod stock_in;
pub mod stock_out;
pub mod supplier;
pub mod user;

pub use activity_log::*;
pub use adjustment::*;
pub use auth::*;
pub use category::*;
pub use health::*;
pub use material::*;
pub use reporting::*;
pub use role::*;
pub use stock_in::*;
pub use stock_out::*;
pub use supplier::*;
pub use user::*;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{ApiResponse, DateRange};

use crate::error::{AppError, AppResult};
use crate::middleware::RequestContext;
use crate::services::ReportingService;

/// Calendar date used for defaults and future-date checks
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn ok<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(message, data))
}

pub(crate) fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::ok(message, data)))
}

/// Optional date range plus output format
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// `json` (default) or `csv`
    pub format: Option<String>,
}

impl RangeQuery {
    /// Both bounds or neither
    pub fn range(&self) -> AppResult<Option<DateRange>> {
        match (self.start_date, self.end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => DateRange::new(start, end)
                .map(Some)
                .map_err(|msg| AppError::validation("start_date", msg, "Tanggal awal tidak boleh setelah tanggal akhir")),
            _ => Err(AppError::validation(
                "end_date",
                "Provide both start_date and end_date",
                "Isi tanggal awal dan tanggal akhir",
            )),
        }
    }

    pub fn required_range(&self) -> AppResult<DateRange> {
        self.range()?.ok_or_else(|| {
            AppError::validation(
                "start_date",
                "A date range is required",
                "Rentang tanggal wajib diisi",
            )
        })
    }

    /// Range, or the trailing `days` days ending today
    pub fn range_or_trailing(&self, days: u32) -> AppResult<DateRange> {
        Ok(self
            .range()?
            .unwrap_or_else(|| DateRange::trailing_days(today(), days)))
    }

    pub fn wants_csv(&self) -> bool {
        self.format
            .as_deref()
            .map(|f| f.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }
}

/// Serve rows as a CSV attachment; requires `report:export`
pub(crate) fn csv_response<T: Serialize>(
    ctx: &RequestContext,
    filename: &str,
    rows: &[T],
) -> AppResult<Response> {
    ctx.require("report", "export")?;

    let csv = ReportingService::export_to_csv(rows)?;
    let disposition = format!("attachment; filename=\"{}.csv\"", filename);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_requires_both_bounds() {
        let q = RangeQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(q.range().is_err());
        assert!(RangeQuery::default().range().unwrap().is_none());
        assert!(RangeQuery::default().required_range().is_err());
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let q = RangeQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            format: Some("CSV".to_string()),
        };
        assert!(q.range().is_err());
        assert!(q.wants_csv());
    }
}
