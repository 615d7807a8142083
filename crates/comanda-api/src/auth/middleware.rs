//! Authentication and authorization gates
//!
//! Two layers guard protected routes. The authentication gate verifies
//! the bearer token, resolves the subject against storage, and attaches
//! an [`AuthenticatedUser`] to the request. Role gates run after it and
//! re-fetch the user so a role change takes effect on in-flight tokens
//! immediately, not at the next login.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::token::{TokenError, TokenKind};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

/// Identity attached to the request by the authentication gate.
///
/// Handlers read this through `Extension<AuthenticatedUser>`. The role
/// is a snapshot from gate time; role gates re-check against storage.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub role: Option<String>,
}

/// Authentication gate for protected routes.
///
/// Checks run in a fixed order so each failure mode has one message:
/// missing header, then header shape, then token verification, then
/// subject resolution. A token whose subject no longer exists is a
/// 404, everything else on this path is a 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match authenticate(&state, &request).await {
        Ok(user) => user,
        Err(err) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: err.to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            return Err(err);
        }
    };
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Run the ordered authentication checks against one request.
async fn authenticate(state: &AppState, request: &Request) -> Result<AuthenticatedUser, ApiError> {
    let header_value = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(ApiError::MissingToken)?;
    let header_str = header_value
        .to_str()
        .map_err(|_| ApiError::MalformedAuthHeader)?;
    if header_str.trim().is_empty() {
        return Err(ApiError::MissingToken);
    }

    let parts: Vec<&str> = header_str.split_whitespace().collect();
    match parts.first() {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {}
        _ => return Err(ApiError::MalformedAuthHeader),
    }
    if parts.len() != 2 {
        return Err(ApiError::EmptyToken);
    }

    let identity = state
        .codec
        .identity(parts[1], TokenKind::Access)
        .map_err(|err| match err {
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::WrongType => ApiError::TokenTypeMismatch,
            TokenError::Invalid | TokenError::Encoding(_) => {
                ApiError::InvalidToken("Invalid token")
            }
        })?;

    let user = state
        .store
        .user_by_id(identity.user_id)
        .await?
        .ok_or(ApiError::IdentityNotFound)?;

    let role = user.role_name().map(str::to_string);
    Ok(AuthenticatedUser {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        role,
    })
}

type RoleCheckFuture = Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>>;

/// Build an authorization gate that admits only the given role.
///
/// Must be layered after [`auth_middleware`]; a request that reaches it
/// without an attached identity is rejected outright. The user is read
/// back from storage on every call, so the check always sees the
/// current role assignment.
pub fn require_role(
    state: Arc<AppState>,
    required_role: &'static str,
) -> impl Fn(Request, Next) -> RoleCheckFuture + Clone {
    move |request: Request, next: Next| {
        let state = state.clone();
        Box::pin(async move {
            let identity = request
                .extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(ApiError::MissingToken)?;

            let user = state
                .store
                .user_by_id(identity.id)
                .await?
                .ok_or(ApiError::IdentityNotFound)?;

            if !user.has_role(required_role) {
                audit_log(&AuditEvent::AccessDenied {
                    user_id: user.id,
                    email: user.email,
                    resource: request.uri().path().to_string(),
                    required_role: required_role.to_string(),
                    ip_address: extract_ip_address(request.headers()),
                    user_agent: extract_user_agent(request.headers()),
                });
                return Err(ApiError::PermissionDenied);
            }

            Ok(next.run(request).await)
        })
    }
}
