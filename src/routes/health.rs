//! Health check endpoints for probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

/// Detailed health status response.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    #[cfg_attr(feature = "utoipa", schema(example = "healthy"))]
    pub status: String,
    /// Service version
    #[cfg_attr(feature = "utoipa", schema(example = "0.1.0"))]
    pub version: String,
    /// Database connection status, absent when no database is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ComponentStatus>,
}

/// Status of a single component.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ComponentStatus {
    #[cfg_attr(feature = "utoipa", schema(example = true))]
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "utoipa", schema(example = json!(null)))]
    pub message: Option<String>,
    /// Latency of the health check in milliseconds
    #[cfg_attr(feature = "utoipa", schema(example = 5))]
    pub latency_ms: u64,
}

/// Full health check.
///
/// Reports the database round trip when one is configured.
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/health",
    tag = "health",
    operation_id = "health_check",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus),
        (status = 503, description = "Service is unhealthy", body = HealthStatus),
    )
))]
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut healthy = true;
    let mut database = None;

    if let Some(db) = &state.db {
        let start = std::time::Instant::now();
        let result = db.health_check().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Database health check failed");
            healthy = false;
        }

        database = Some(ComponentStatus {
            healthy: result.is_ok(),
            message: result
                .err()
                .map(|_| "Database connection failed".to_string()),
            latency_ms,
        });
    }

    let health = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// Liveness probe. Succeeds whenever the process is serving requests.
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    operation_id = "health_liveness",
    responses(
        (status = 200, description = "Service is alive"),
    )
))]
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe. Fails while the configured database is unreachable.
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    operation_id = "health_readiness",
    responses(
        (status = 200, description = "Service is ready to accept traffic"),
        (status = 503, description = "Database unavailable"),
    )
))]
#[tracing::instrument(name = "health.readiness", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(db) = &state.db
        && db.health_check().await.is_err()
    {
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}
