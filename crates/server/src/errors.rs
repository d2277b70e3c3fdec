use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use service::auth::errors::AuthError;
use service::errors::ServiceError;
use service::scoping::errors::ScopingError;

/// Request-level error taxonomy. Everything a handler can fail with maps
/// onto exactly one of these.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("expired")]
    Expired,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    StateConflict(String),
    #[error("internal error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            // Distinct from plain 401: an expired grant can be re-issued, a
            // bad or consumed one cannot.
            ApiError::Expired => StatusCode::GONE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::StateConflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let ApiError::Internal(detail) = &self {
            error!(error = %detail, "request failed");
        }
        // The uniform bodies never echo internal detail or distinguish
        // unauthorized causes.
        let msg = match &self {
            ApiError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthorized => ApiError::Unauthorized,
            AuthError::NotFound => ApiError::NotFound,
            AuthError::Validation(msg) => ApiError::Validation(msg),
            AuthError::Conflict => ApiError::StateConflict("already exists".into()),
            AuthError::Repository(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ScopingError> for ApiError {
    fn from(e: ScopingError) -> Self {
        match e {
            ScopingError::Validation(msg) => ApiError::Validation(msg),
            ScopingError::NotFound => ApiError::NotFound,
            ScopingError::StateConflict { .. } => ApiError::StateConflict(e.to_string()),
            ScopingError::Expired => ApiError::Expired,
            ScopingError::Repository(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => ApiError::Validation(msg),
            ServiceError::NotFound(_) => ApiError::NotFound,
            ServiceError::Db(msg) => ApiError::Internal(msg),
            ServiceError::Model(m) => match m {
                models::errors::ModelError::Validation(msg) => ApiError::Validation(msg),
                models::errors::ModelError::NotFound(_) => ApiError::NotFound,
                models::errors::ModelError::Db(msg) => ApiError::Internal(msg),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_grants_get_their_own_status() {
        let resp = ApiError::from(ScopingError::Expired).into_response();
        assert_eq!(resp.status(), StatusCode::GONE);

        // A consumed or unknown grant stays a plain not-found.
        let resp = ApiError::from(ScopingError::NotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
