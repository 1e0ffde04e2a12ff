use serde::{Deserialize, Serialize};
#[cfg(feature = "utoipa")]
use utoipa::OpenApi;

#[cfg(feature = "utoipa")]
use crate::{
    models,
    routes::{admin, health},
};

/// Admin prefix the documented paths are written against.
#[cfg(feature = "utoipa")]
const DOCUMENTED_ADMIN_BASE_PATH: &str = "/admin/v1";

#[cfg(feature = "utoipa")]
/// OpenAPI documentation for the billing tag reporting service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Billing Tag Reports API",
        version = "0.1.0",
        description = r#"Usage reports grouped by **billing tag**.

A request's billing tag is the `billing_tag` field of its token's settings when
that is set and non-empty, otherwise the group of the user who owns the request.
Only completion requests are counted, and dates are UTC calendar days.

All error responses share one envelope:

```json
{"success": false, "message": "invalid start_time format, expected YYYY-MM-DD"}
```
"#,
        license(name = "Apache-2.0 OR MIT")
    ),
    tags(
        (name = "billing-tags", description = "Billing tag usage reports"),
        (name = "health", description = "Health checks"),
    ),
    paths(
        admin::billing_tags::get_statistics,
        health::health_check,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        models::BillingTagStatistic,
        models::ModelUsageByBillingTag,
        admin::billing_tags::BillingTagReportResponse,
        ErrorResponse,
        health::HealthStatus,
        health::ComponentStatus,
    ))
)]
pub struct ApiDoc;

#[cfg(all(feature = "utoipa", feature = "csv-export"))]
#[derive(OpenApi)]
#[openapi(paths(admin::billing_tags::export_statistics))]
struct CsvExportApiDoc;

#[cfg(feature = "utoipa")]
impl ApiDoc {
    /// Build the full OpenAPI spec, including the CSV export when compiled in.
    #[allow(unused_mut)]
    pub fn build() -> utoipa::openapi::OpenApi {
        let mut spec = Self::openapi();
        #[cfg(feature = "csv-export")]
        spec.merge(CsvExportApiDoc::openapi());
        spec
    }

    /// Build the spec with admin paths rebased onto `admin_base_path`.
    pub fn build_for(admin_base_path: &str) -> utoipa::openapi::OpenApi {
        let mut spec = Self::build();
        let paths = std::mem::take(&mut spec.paths.paths);
        spec.paths.paths = paths
            .into_iter()
            .map(|(path, item)| match path.strip_prefix(DOCUMENTED_ADMIN_BASE_PATH) {
                Some(rest) => (format!("{admin_base_path}{rest}"), item),
                None => (path, item),
            })
            .collect();
        spec
    }
}

/// Error response body shared by every admin endpoint
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    /// Always false
    #[cfg_attr(feature = "utoipa", schema(example = false))]
    pub success: bool,
    /// Human-readable reason
    #[cfg_attr(
        feature = "utoipa",
        schema(example = "invalid start_time format, expected YYYY-MM-DD")
    )]
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
