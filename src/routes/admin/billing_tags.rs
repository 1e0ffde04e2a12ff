use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "csv-export")]
use super::csv_export::{CsvResponse, export_filename, statistics_csv_body};
use super::error::AdminError;
use crate::{
    AppState,
    db::DateRange,
    models::{BillingTagStatistic, ModelUsageByBillingTag},
    services::Services,
};

fn get_services(state: &AppState) -> Result<&Services, AdminError> {
    state.services.as_ref().ok_or(AdminError::DatabaseRequired)
}

/// Query parameters for billing tag report endpoints
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::IntoParams))]
pub struct BillingTagStatisticsQuery {
    /// First day of the range, inclusive (YYYY-MM-DD, UTC)
    pub start_time: Option<String>,
    /// Last day of the range, inclusive (YYYY-MM-DD, UTC)
    pub end_time: Option<String>,
}

impl BillingTagStatisticsQuery {
    /// Validate both bounds. A reversed range is accepted and matches nothing.
    pub fn parse_date_range(&self) -> Result<DateRange, AdminError> {
        let start = required(self.start_time.as_deref(), "start_time")?;
        let end = required(self.end_time.as_deref(), "end_time")?;
        Ok(DateRange {
            start: parse_date(start, "start_time")?,
            end: parse_date(end, "end_time")?,
        })
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AdminError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AdminError::InvalidParameters(format!("{field} is required"))),
    }
}

/// Parse a strict, zero-padded `YYYY-MM-DD` calendar date.
///
/// chrono alone accepts unpadded fields and signed years, so the shape is
/// checked first.
pub fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, AdminError> {
    let well_formed = value.len() == 10
        && value.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(AdminError::InvalidDateFormat { field });
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| AdminError::InvalidDateFormat { field })
}

fn bind_query(
    query: Result<Query<BillingTagStatisticsQuery>, QueryRejection>,
) -> Result<BillingTagStatisticsQuery, AdminError> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| AdminError::InvalidParameters(rejection.body_text()))
}

/// Billing tag report response
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BillingTagReportResponse {
    /// Always true on success
    pub success: bool,
    /// Empty on success
    pub message: String,
    /// Per-tag totals, highest quota first
    pub data: Vec<BillingTagStatistic>,
    /// Request counts per (tag, model)
    pub model_usage: Vec<ModelUsageByBillingTag>,
}

/// Get billing tag statistics
///
/// Aggregates completion requests in the date range by billing tag. A request's
/// tag is its token's `billing_tag` setting when set and non-empty, otherwise
/// the owning user's group.
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/admin/v1/billing-tags/statistics",
    tag = "billing-tags",
    operation_id = "billing_tag_statistics",
    params(BillingTagStatisticsQuery),
    responses(
        (status = 200, description = "Per-tag statistics and model usage. A missing or malformed date, or a failed query, is also answered with 200 and `{success: false, message}`.", body = BillingTagReportResponse),
        (status = 501, description = "No database configured", body = crate::openapi::ErrorResponse),
    )
))]
#[tracing::instrument(name = "admin.billing_tags.statistics", skip(state, query))]
pub async fn get_statistics(
    State(state): State<AppState>,
    query: Result<Query<BillingTagStatisticsQuery>, QueryRejection>,
) -> Result<Json<BillingTagReportResponse>, AdminError> {
    let services = get_services(&state)?;
    let range = bind_query(query)?.parse_date_range()?;
    tracing::debug!(start = %range.start, end = %range.end, "Building billing tag report");

    let report = services.billing_tags.get_report(range).await?;

    Ok(Json(BillingTagReportResponse {
        success: true,
        message: String::new(),
        data: report.statistics,
        model_usage: report.model_usage,
    }))
}

/// Export billing tag statistics as CSV
///
/// Same rows as the statistics endpoint, without the model breakdown, as a
/// UTF-8 CSV download with a byte order mark.
#[cfg(feature = "csv-export")]
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/admin/v1/billing-tags/statistics/export",
    tag = "billing-tags",
    operation_id = "billing_tag_statistics_export",
    params(BillingTagStatisticsQuery),
    responses(
        (status = 200, description = "CSV document, or a JSON `{success: false, message}` when the dates are invalid or the query fails",
            content(
                (String = "text/csv"),
                (crate::openapi::ErrorResponse = "application/json"),
            )
        ),
        (status = 501, description = "No database configured", body = crate::openapi::ErrorResponse),
    )
))]
#[tracing::instrument(name = "admin.billing_tags.export", skip(state, query))]
pub async fn export_statistics(
    State(state): State<AppState>,
    query: Result<Query<BillingTagStatisticsQuery>, QueryRejection>,
) -> Result<CsvResponse, AdminError> {
    let services = get_services(&state)?;
    let range = bind_query(query)?.parse_date_range()?;
    tracing::debug!(start = %range.start, end = %range.end, "Exporting billing tag statistics");

    let statistics = services.billing_tags.get_statistics(range).await?;
    let body = statistics_csv_body(statistics, state.config.reporting.csv_header_locale)?;

    Ok(CsvResponse {
        body,
        filename: export_filename(
            &range.start.format("%Y-%m-%d").to_string(),
            &range.end.format("%Y-%m-%d").to_string(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn query(start: Option<&str>, end: Option<&str>) -> BillingTagStatisticsQuery {
        BillingTagStatisticsQuery {
            start_time: start.map(String::from),
            end_time: end.map(String::from),
        }
    }

    #[test]
    fn test_valid_range() {
        let range = query(Some("2024-01-01"), Some("2024-01-31"))
            .parse_date_range()
            .unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_reversed_range_accepted() {
        let range = query(Some("2024-02-01"), Some("2024-01-01"))
            .parse_date_range()
            .unwrap();
        assert!(range.end < range.start);
    }

    #[rstest]
    #[case(None, Some("2024-01-01"), "invalid parameters: start_time is required")]
    #[case(Some(""), Some("2024-01-01"), "invalid parameters: start_time is required")]
    #[case(Some("2024-01-01"), None, "invalid parameters: end_time is required")]
    #[case(Some("2024-01-01"), Some(""), "invalid parameters: end_time is required")]
    #[case(None, None, "invalid parameters: start_time is required")]
    fn test_missing_parameters(
        #[case] start: Option<&str>,
        #[case] end: Option<&str>,
        #[case] message: &str,
    ) {
        let err = query(start, end).parse_date_range().unwrap_err();
        assert!(matches!(err, AdminError::InvalidParameters(_)));
        assert_eq!(err.to_string(), message);
    }

    #[rstest]
    #[case("2024/01/01")]
    #[case("2024-1-01")]
    #[case("2024-01-1")]
    #[case("02024-1-01")]
    #[case("+2024-01-0")]
    #[case("2024-13-01")]
    #[case("2023-02-29")]
    #[case("2024-01-01T00:00:00")]
    #[case("20240101")]
    #[case("yesterday")]
    fn test_malformed_start_date(#[case] value: &str) {
        let err = query(Some(value), Some("2024-01-31"))
            .parse_date_range()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid start_time format, expected YYYY-MM-DD"
        );
    }

    #[test]
    fn test_malformed_end_date() {
        let err = query(Some("2024-01-01"), Some("31-01-2024"))
            .parse_date_range()
            .unwrap_err();
        assert!(matches!(
            err,
            AdminError::InvalidDateFormat { field: "end_time" }
        ));
    }

    #[test]
    fn test_leap_day_accepted() {
        assert_eq!(
            parse_date("2024-02-29", "start_time").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }
}
