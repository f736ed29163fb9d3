use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::blob::BlobError;
use super::repository::RepositoryError;

/// Domain error taxonomy. Every variant carries the caller-facing message;
/// operator detail for `Internal` is logged at the failure site, never
/// returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// Authenticated caller lacks the company role required by the operation.
    #[error("Only companies can post jobs")]
    CompanyRequired,
    /// Missing or unrecognized bearer token.
    #[error("Unauthenticated")]
    Unauthenticated,
    /// Authenticated but not permitted.
    #[error("{0}")]
    Forbidden(String),
    /// Target absent, or intentionally hidden from this caller.
    #[error("{0}")]
    NotFound(String),
    /// A business invariant would be violated.
    #[error("{0}")]
    Conflict(String),
    /// Unexpected failure. The message is caller-safe.
    #[error("{0}")]
    Internal(String),
}

impl MarketplaceError {
    pub fn code(&self) -> &'static str {
        match self {
            MarketplaceError::Validation(_) => "validation_error",
            MarketplaceError::CompanyRequired => "company_required",
            MarketplaceError::Unauthenticated => "unauthenticated",
            MarketplaceError::Forbidden(_) => "forbidden",
            MarketplaceError::NotFound(_) => "not_found",
            MarketplaceError::Conflict(_) => "conflict",
            MarketplaceError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            MarketplaceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketplaceError::CompanyRequired | MarketplaceError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            MarketplaceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketplaceError::Conflict(_) => StatusCode::CONFLICT,
            MarketplaceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "code": self.code(),
            }
        }));
        (self.status(), body).into_response()
    }
}

impl From<RepositoryError> for MarketplaceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => MarketplaceError::Conflict("conflict".to_string()),
            RepositoryError::NotFound => MarketplaceError::NotFound("Not found".to_string()),
            RepositoryError::Unavailable(reason) => {
                tracing::error!(%reason, "repository unavailable");
                MarketplaceError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<BlobError> for MarketplaceError {
    fn from(value: BlobError) -> Self {
        match value {
            BlobError::NotFound => MarketplaceError::NotFound("CV not found".to_string()),
            BlobError::Unavailable(reason) => {
                tracing::error!(%reason, "blob store unavailable");
                MarketplaceError::Internal("Internal server error".to_string())
            }
        }
    }
}
