//! API error taxonomy and HTTP responses
//!
//! Author: hephaex@gmail.com

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use comanda_core::StoreError;
use serde::Serialize;
use utoipa::ToSchema;

/// Error returned by handlers and middleware.
///
/// Every variant maps to exactly one HTTP status and one client-visible
/// message. Storage failures keep their detail out of the response body
/// and log it instead.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No credential was presented at all.
    #[error("Token required")]
    MissingToken,

    /// The Authorization header is present but not `Bearer <token>`.
    #[error("Invalid authorization header format")]
    MalformedAuthHeader,

    /// The Bearer scheme was given without exactly one token after it.
    #[error("Token not found")]
    EmptyToken,

    /// The token signature is valid but the token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The token failed signature or claim validation.
    #[error("{0}")]
    InvalidToken(&'static str),

    /// A token of the wrong kind was presented (refresh where access
    /// is required, or the reverse).
    #[error("Invalid token type")]
    TokenTypeMismatch,

    /// The presented password does not match the stored hash.
    #[error("{0}")]
    InvalidCredentials(&'static str),

    /// The identity referenced by a token or request no longer exists.
    #[error("User not found")]
    IdentityNotFound,

    /// The authenticated user lacks the role required by the route.
    #[error("Unauthorized access")]
    PermissionDenied,

    /// The request body failed validation.
    #[error("{0}")]
    Validation(String),

    /// The storage backend failed. The detail is logged, never returned.
    #[error("{0}")]
    Storage(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken
            | ApiError::MalformedAuthHeader
            | ApiError::EmptyToken
            | ApiError::TokenExpired
            | ApiError::InvalidToken(_)
            | ApiError::TokenTypeMismatch
            | ApiError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            ApiError::IdentityNotFound => StatusCode::NOT_FOUND,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body.
    fn public_message(&self) -> String {
        match self {
            ApiError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserNotFound => ApiError::IdentityNotFound,
            StoreError::EmailAlreadyExists => {
                ApiError::Validation("User already exists".to_string())
            }
            StoreError::RoleNotFound => ApiError::Validation("Role not found".to_string()),
            StoreError::Database(detail) => ApiError::Storage(detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(detail) = &self {
            tracing::error!(detail = %detail, "request failed with storage error");
        }
        let body = Json(ErrorBody {
            error: self.public_message(),
        });
        (self.status(), body).into_response()
    }
}

/// JSON body carried by every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Client-visible error message
    #[schema(example = "Token required")]
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::MalformedAuthHeader.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::TokenTypeMismatch.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::IdentityNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Validation("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Storage("db down".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_detail_is_not_exposed() {
        let err = ApiError::Storage("connection refused at 10.0.0.5".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_exact_client_messages() {
        assert_eq!(ApiError::MissingToken.to_string(), "Token required");
        assert_eq!(
            ApiError::MalformedAuthHeader.to_string(),
            "Invalid authorization header format"
        );
        assert_eq!(ApiError::EmptyToken.to_string(), "Token not found");
        assert_eq!(ApiError::TokenExpired.to_string(), "Token expired");
        assert_eq!(
            ApiError::InvalidToken("Invalid token").to_string(),
            "Invalid token"
        );
        assert_eq!(
            ApiError::TokenTypeMismatch.to_string(),
            "Invalid token type"
        );
        assert_eq!(ApiError::IdentityNotFound.to_string(), "User not found");
        assert_eq!(
            ApiError::PermissionDenied.to_string(),
            "Unauthorized access"
        );
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(
            ApiError::from(StoreError::UserNotFound),
            ApiError::IdentityNotFound
        ));
        match ApiError::from(StoreError::EmailAlreadyExists) {
            ApiError::Validation(msg) => assert_eq!(msg, "User already exists"),
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(matches!(
            ApiError::from(StoreError::Database("boom".to_string())),
            ApiError::Storage(_)
        ));
    }
}
