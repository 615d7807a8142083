//! User management handlers
//!
//! The hello endpoint is the smallest authenticated surface, useful for
//! smoke-testing a token. The admin endpoints manage accounts and role
//! assignments and sit behind the admin role gate.
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, AuditEvent};
use crate::auth::middleware::AuthenticatedUser;
use crate::error::{ApiError, ErrorBody};
use crate::handlers::auth::MessageResponse;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use comanda_core::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Client-visible account fields
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub email: String,
    /// Role name, or null for customers
    pub role: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            role: user.role_name().map(str::to_string),
            first_name: user.first_name,
            email: user.email,
        }
    }
}

/// User listing response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
}

/// Role assignment request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    /// Role name to assign, or null to clear the role
    pub role: Option<String>,
}

/// Greet the authenticated caller
#[utoipa::path(
    get,
    path = "/api/v1/hello",
    tag = "users",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Greeting", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    )
)]
pub async fn hello_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("Hello user {}", user.email),
    })
}

/// List all accounts, ordered by email
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "All accounts", body = UserListResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state
        .store
        .list_users()
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();
    Ok(Json(UserListResponse { users }))
}

/// Assign or clear an account's role
///
/// The role takes effect immediately; role gates re-check storage on
/// every request, so outstanding tokens pick it up without a re-login.
///
/// # Responses
///
/// * `200 OK` - Updated account
/// * `400 Bad Request` - Unknown role name
/// * `404 Not Found` - No such account
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    tag = "admin",
    request_body = SetRoleRequest,
    security(("bearer_token" = [])),
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Role updated", body = UserSummary),
        (status = 400, description = "Unknown role", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    )
)]
pub async fn set_role_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    let role_id = match body.role.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => {
            let role = state
                .store
                .role_by_name(name)
                .await?
                .ok_or_else(|| ApiError::Validation("Role not found".to_string()))?;
            Some(role.id)
        }
        None => None,
    };

    let user = state.store.set_user_role(id, role_id).await?;
    audit_log(&AuditEvent::RoleAssigned {
        user_id: user.id,
        role: user.role_name().map(str::to_string),
    });
    Ok(Json(UserSummary::from(user)))
}

/// Remove an account and its login history
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    security(("bearer_token" = [])),
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account removed", body = MessageResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .store
        .user_by_id(id)
        .await?
        .ok_or(ApiError::IdentityNotFound)?;
    state.store.delete_user(user.id).await?;

    audit_log(&AuditEvent::UserRemoved {
        user_id: user.id,
        email: user.email,
    });
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}
