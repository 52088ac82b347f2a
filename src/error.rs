use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{auth::TokenError, password::PasswordError, repository::RepoError};

/// API result type alias.
pub type ApiResult<T> = Result<T, ApiError>;

/// ApiError
///
/// The route-boundary error taxonomy. Every handler and gate returns this, and it renders
/// as `{ "message": ... }` with no internal detail. Internal causes only reach the logs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed, invalid or expired credential.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Role or ownership check failed.
    #[error("forbidden by {0:?} check")]
    Forbidden(Denial),

    #[error("{0}")]
    NotFound(String),

    /// A required field is missing or blank.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unique constraint violated (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage, hashing or codec failure. The string is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Denial
///
/// Which gate turned the caller away. The auth gate answers "Auth failed" for a role
/// outside its set; the ownership gate answers "Unauthorized".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Role,
    Ownership,
}

/// ErrorBody
///
/// The JSON shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub message: String,
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{entity} not found"))
    }

    /// Forbidden keeps answering 401 so existing clients see the same status codes
    /// they always did; the variant stays distinct for logging and tests.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::Forbidden(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Unauthenticated | ApiError::Forbidden(Denial::Role) => "Auth failed".to_string(),
            ApiError::Forbidden(Denial::Ownership) => "Unauthorized".to_string(),
            ApiError::NotFound(msg) | ApiError::Validation(msg) | ApiError::Conflict(msg) => msg,
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal error occurred".to_string()
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(entity) => ApiError::not_found(entity),
            RepoError::Conflict(msg) => ApiError::Conflict(msg),
            RepoError::Database(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) | TokenError::Expired => ApiError::Unauthenticated,
            TokenError::Encode(detail) => ApiError::Internal(format!("token encoding: {detail}")),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("password operation failed: {err}"))
    }
}
