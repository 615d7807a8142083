//! Authentication API handlers
//!
//! HTTP surface for account signup, login, token refresh, password
//! changes, and login history. The ordered checks behind each endpoint
//! live in [`crate::auth::service`].
//!
//! Author: hephaex@gmail.com

use crate::audit::{extract_ip_address, extract_user_agent};
use crate::auth::middleware::AuthenticatedUser;
use crate::auth::service;
use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Signup request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    /// Display name
    pub first_name: Option<String>,
    /// Unique email address used to log in
    #[validate(email)]
    pub email: Option<String>,
    /// Initial password
    pub password: Option<String>,
}

/// Login request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Token pair returned by login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Long-lived refresh token
    pub refresh: String,
    /// Short-lived access token
    pub access: String,
}

/// Refresh request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// New access token issued from a refresh token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    /// RFC 3339 instant after which the access token stops working
    pub access_token_expiration: String,
    /// Replacement refresh token, present only when rotation is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Password change request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// One recorded login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginHistoryEntry {
    /// RFC 3339 login instant
    pub timestamp: String,
    /// User agent presented at login, if any
    pub user_agent: Option<String>,
}

/// Login history response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginHistoryResponse {
    pub login_history: Vec<LoginHistoryEntry>,
}

/// Plain message response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Treat absent and empty-string fields the same way.
fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Create a new account
///
/// New accounts have no role; staff roles are assigned separately by
/// an administrator. No tokens are issued here, the client logs in
/// afterwards.
///
/// # Responses
///
/// * `201 Created` - Account created
/// * `400 Bad Request` - Missing fields, bad email, or email taken
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (first_name, email, password) = match (
        required(&body.first_name),
        required(&body.email),
        required(&body.password),
    ) {
        (Some(first_name), Some(email), Some(password)) => (first_name, email, password),
        _ => return Err(ApiError::Validation("Missing required fields".to_string())),
    };
    body.validate()
        .map_err(|_| ApiError::Validation("Invalid email".to_string()))?;

    service::signup(&state, first_name, email, password).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".to_string(),
        }),
    ))
}

/// Log in with email and password
///
/// On success the login is recorded in the history and a refresh plus
/// access token pair is returned.
///
/// # Responses
///
/// * `200 OK` - Token pair issued
/// * `400 Bad Request` - Missing fields
/// * `401 Unauthorized` - Wrong password
/// * `404 Not Found` - No account with that email
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Invalid password", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (email, password) = match (required(&body.email), required(&body.password)) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(ApiError::Validation("Missing required fields".to_string())),
    };
    let login_ip = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let pair = service::login(
        &state,
        email,
        password,
        login_ip.as_deref(),
        user_agent.as_deref(),
    )
    .await?;

    Ok(Json(LoginResponse {
        refresh: pair.refresh.token,
        access: pair.access.token,
    }))
}

/// Exchange a refresh token for a new access token
///
/// # Responses
///
/// * `200 OK` - New access token issued
/// * `400 Bad Request` - No refresh token in the body
/// * `401 Unauthorized` - Refresh token did not verify
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token refreshed", body = RefreshResponse),
        (status = 400, description = "Refresh token required", body = ErrorBody),
        (status = 401, description = "Invalid refresh token", body = ErrorBody),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = required(&body.refresh_token)
        .ok_or_else(|| ApiError::Validation("Refresh token required".to_string()))?;

    let outcome = service::refresh(&state, token).await?;

    Ok(Json(RefreshResponse {
        access_token: outcome.access.token,
        access_token_expiration: outcome.access.expires_at.to_rfc3339(),
        refresh_token: outcome.refresh.map(|minted| minted.token),
    }))
}

/// Change the caller's password
///
/// # Responses
///
/// * `200 OK` - Password replaced
/// * `400 Bad Request` - Missing fields
/// * `401 Unauthorized` - Old password did not match
#[utoipa::path(
    put,
    path = "/api/v1/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Password changed successfully", body = MessageResponse),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Invalid old password", body = ErrorBody),
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (old_password, new_password) =
        match (required(&body.old_password), required(&body.new_password)) {
            (Some(old_password), Some(new_password)) => (old_password, new_password),
            _ => return Err(ApiError::Validation("Missing required fields".to_string())),
        };

    service::change_password(&state, user.id, old_password, new_password).await?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// List the caller's recorded logins, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/auth/login-history",
    tag = "auth",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Login history", body = LoginHistoryResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    )
)]
pub async fn login_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<LoginHistoryResponse>, ApiError> {
    let entries = state.store.login_history(user.id).await?;

    let login_history = entries
        .into_iter()
        .map(|entry| LoginHistoryEntry {
            timestamp: entry.login_time.to_rfc3339(),
            user_agent: entry.user_agent,
        })
        .collect();

    Ok(Json(LoginHistoryResponse { login_history }))
}
