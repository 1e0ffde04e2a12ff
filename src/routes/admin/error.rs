use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{db::DbError, openapi::ErrorResponse};

/// Failure of an admin report request.
///
/// Every variant renders as `{"success": false, "message": ...}`.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Missing or unbindable query parameter.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A date parameter that is not a `YYYY-MM-DD` calendar date.
    #[error("invalid {field} format, expected YYYY-MM-DD")]
    InvalidDateFormat { field: &'static str },

    /// Aggregation query failure. The database message is passed through.
    #[error(transparent)]
    Database(DbError),

    /// The CSV document could not be encoded.
    #[error("failed to write CSV: {0}")]
    CsvWrite(String),

    #[error("this endpoint requires a configured database")]
    DatabaseRequired,
}

impl AdminError {
    /// HTTP status of the error response.
    ///
    /// Request and query failures are reported through the body's `success` flag
    /// with a 200. Only a missing database uses an error status.
    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::InvalidParameters(_)
            | AdminError::InvalidDateFormat { .. }
            | AdminError::Database(_)
            | AdminError::CsvWrite(_) => StatusCode::OK,
            AdminError::DatabaseRequired => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl From<DbError> for AdminError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotConfigured => AdminError::DatabaseRequired,
            #[allow(unreachable_patterns)]
            _ => {
                tracing::error!(error = %err, "Billing tag query failed");
                AdminError::Database(err)
            }
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        if let AdminError::CsvWrite(msg) = &self {
            tracing::error!(error = %msg, "CSV export failed");
        }
        (self.status(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
