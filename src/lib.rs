//! Billing tag usage reporting service.
//!
//! Aggregates completion-request usage from an LLM gateway's request log by
//! billing tag and serves the results as JSON or a CSV download.

use std::sync::Arc;

#[cfg(feature = "utoipa")]
use axum::{Json, extract::State};
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod openapi;
pub mod routes;
pub mod services;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::ReportingServiceConfig>,
    pub db: Option<Arc<db::DbPool>>,
    pub services: Option<services::Services>,
}

impl AppState {
    /// Connect to the configured database, if any, and build the services.
    pub async fn new(config: config::ReportingServiceConfig) -> Result<Self, db::DbError> {
        if config.database.is_none() {
            tracing::warn!("No database configured; billing tag report routes are disabled");
            return Ok(Self {
                config: Arc::new(config),
                db: None,
                services: None,
            });
        }

        let pool = db::DbPool::from_config(&config.database).await?;
        if config.database.run_migrations() {
            pool.run_migrations().await?;
        }
        tracing::info!(dialect = ?pool.dialect(), "Database connected");

        Ok(Self::with_db(config, Arc::new(pool)))
    }

    /// Build state around an already connected pool.
    pub fn with_db(config: config::ReportingServiceConfig, db: Arc<db::DbPool>) -> Self {
        let services = services::Services::new(db.clone());
        Self {
            config: Arc::new(config),
            db: Some(db),
            services: Some(services),
        }
    }
}

/// Build the application router.
///
/// Report routes are mounted under `server.admin_base_path` only when a
/// database is available.
pub fn build_app(config: &config::ReportingServiceConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness));

    #[cfg(feature = "utoipa")]
    {
        app = app.route("/openapi.json", get(openapi_json));
    }

    if state.services.is_some() {
        app = app.nest(
            &config.server.admin_base_path,
            routes::admin::get_admin_routes(),
        );
    }

    app.layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Returns the OpenAPI spec as JSON, with paths under the configured admin prefix
#[cfg(feature = "utoipa")]
async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::build_for(
        &state.config.server.admin_base_path,
    ))
}
