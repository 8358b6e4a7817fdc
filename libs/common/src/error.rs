//! Custom error types for the common library
//!
//! `DatabaseError` covers pool bootstrap and migrations, `StoreError` is what
//! every storage backend returns, and `ApiError` is the HTTP-facing error that
//! both services render as `{"success": false, "message": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::Error as SqlxError;
use thiserror::Error;
use tracing::error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised by the storage backends
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    /// The underlying query failed
    #[error("Storage query error: {0}")]
    Query(#[from] SqlxError),

    /// A stored value could not be mapped back onto the model
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// Reading or writing the snapshot file failed
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Type alias for storage results
pub type StoreResult<T> = Result<T, StoreError>;

/// Why the authentication gate rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization` header, or not a bearer header
    MissingToken,
    /// `Bearer` prefix present but no token after it
    MalformedToken,
    /// Signature or structure check failed
    InvalidToken,
    /// Token was valid once but is past its expiry
    ExpiredToken,
    /// Token names a user that no longer exists
    UnknownUser,
    /// Email/password pair did not match
    BadCredentials,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "Access denied. No token provided.",
            AuthFailure::MalformedToken => "Access denied. Invalid token format.",
            AuthFailure::InvalidToken => "Invalid token.",
            AuthFailure::ExpiredToken => "Token has expired.",
            AuthFailure::UnknownUser => "User not found. Token is invalid.",
            AuthFailure::BadCredentials => "Invalid email or password",
        }
    }
}

/// HTTP-facing error type shared by the services
#[derive(Error, Debug)]
pub enum ApiError {
    /// Validation failure
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication failure
    #[error("Unauthorized: {}", .0.message())]
    Unauthorized(AuthFailure),

    /// Resource absent or not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is temporarily locked out
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// An external collaborator failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(StoreError::Duplicate(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::Upstream(msg) => msg.clone(),
            ApiError::Unauthorized(reason) => reason.message().to_string(),
            ApiError::Store(StoreError::Duplicate(msg)) => msg.clone(),
            ApiError::InternalServerError => "Internal server error".to_string(),
            ApiError::Store(e) => {
                error!("Storage failure: {}", e);
                "Internal server error".to_string()
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<AuthFailure> for ApiError {
    fn from(reason: AuthFailure) -> Self {
        ApiError::Unauthorized(reason)
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized(AuthFailure::ExpiredToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Store(StoreError::Duplicate("email".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Store(StoreError::Corrupt("priority".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Upstream("planner".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak_details() {
        let response =
            ApiError::Store(StoreError::Snapshot("/secret/path: denied".into())).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
    }
}
