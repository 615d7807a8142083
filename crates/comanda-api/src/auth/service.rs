//! Account and session flows
//!
//! The handlers stay thin; the ordered checks that give each flow its
//! exact failure responses live here, against the storage trait, so
//! they can be exercised without HTTP plumbing.

use crate::audit::{audit_log, AuditEvent};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::{MintedToken, TokenKind};
use crate::error::ApiError;
use crate::state::AppState;
use comanda_core::{NewUser, User, UserStore as _};
use uuid::Uuid;

/// Recorded when the client never sent a real address.
const DEFAULT_LOGIN_IP: &str = "0.0.0.0";

/// Both tokens issued at login.
#[derive(Debug)]
pub struct TokenPair {
    pub refresh: MintedToken,
    pub access: MintedToken,
}

/// Result of a refresh call. The new refresh token is only present
/// when rotation is enabled in the auth config.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub access: MintedToken,
    pub refresh: Option<MintedToken>,
}

/// Create a new account.
///
/// New accounts carry no role. Staff roles are assigned later by an
/// administrator; customers never need one.
pub async fn signup(
    state: &AppState,
    first_name: &str,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    if state.store.user_by_email(email).await?.is_some() {
        audit_log(&AuditEvent::RegistrationFailure {
            email: email.to_string(),
            reason: "Email already registered".to_string(),
        });
        return Err(ApiError::Validation("User already exists".to_string()));
    }

    let password_hash =
        hash_password(password).map_err(|e| ApiError::Storage(e.to_string()))?;
    let user = state
        .store
        .create_user(NewUser {
            first_name: first_name.to_string(),
            email: email.to_string(),
            password_hash,
            role_id: None,
        })
        .await?;

    audit_log(&AuditEvent::RegistrationSuccess {
        user_id: user.id,
        email: user.email.clone(),
    });
    Ok(user)
}

/// Check credentials and issue a token pair.
///
/// The login is recorded in the history, with the client address when
/// one was resolved, before any token is minted; a failure to record
/// is a failure to log in.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    login_ip: Option<&str>,
    user_agent: Option<&str>,
) -> Result<TokenPair, ApiError> {
    let login_ip = login_ip.unwrap_or(DEFAULT_LOGIN_IP);
    let user = state
        .store
        .user_by_email(email)
        .await?
        .ok_or(ApiError::IdentityNotFound)?;

    let matches = verify_password(password, &user.password_hash)
        .map_err(|e| ApiError::Storage(e.to_string()))?;
    if !matches {
        audit_log(&AuditEvent::LoginFailure {
            email: email.to_string(),
            reason: "Invalid password".to_string(),
            ip_address: login_ip.to_string(),
            user_agent: user_agent.map(str::to_string),
        });
        return Err(ApiError::InvalidCredentials("Invalid password"));
    }

    state
        .store
        .record_login(user.id, login_ip, user_agent)
        .await?;

    let refresh = state
        .codec
        .mint(user.id, &user.email, TokenKind::Refresh)
        .map_err(|e| ApiError::Storage(e.to_string()))?;
    let access = state
        .codec
        .mint(user.id, &user.email, TokenKind::Access)
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    audit_log(&AuditEvent::LoginSuccess {
        user_id: user.id,
        email: user.email.clone(),
        ip_address: login_ip.to_string(),
        user_agent: user_agent.map(str::to_string),
    });
    Ok(TokenPair { refresh, access })
}

/// Exchange a refresh token for a fresh access token.
///
/// Every verification failure collapses into one client-visible
/// message so the endpoint leaks nothing about why a token was bad.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<RefreshOutcome, ApiError> {
    let identity = state
        .codec
        .identity(refresh_token, TokenKind::Refresh)
        .map_err(|_| ApiError::InvalidToken("Invalid refresh token"))?;

    let access = state
        .codec
        .mint(identity.user_id, &identity.email, TokenKind::Access)
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    let refresh = if state.config.auth.rotate_refresh_tokens {
        let minted = state
            .codec
            .mint(identity.user_id, &identity.email, TokenKind::Refresh)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        Some(minted)
    } else {
        None
    };

    audit_log(&AuditEvent::TokenRefresh {
        user_id: identity.user_id,
        email: identity.email.clone(),
        rotated: refresh.is_some(),
    });
    Ok(RefreshOutcome { access, refresh })
}

/// Replace the caller's password after checking the old one.
pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    let user = state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or(ApiError::IdentityNotFound)?;

    let matches = verify_password(old_password, &user.password_hash)
        .map_err(|e| ApiError::Storage(e.to_string()))?;
    if !matches {
        return Err(ApiError::InvalidCredentials("Invalid old password"));
    }

    let password_hash =
        hash_password(new_password).map_err(|e| ApiError::Storage(e.to_string()))?;
    state
        .store
        .update_password_hash(user.id, &password_hash)
        .await?;

    audit_log(&AuditEvent::PasswordChange {
        user_id: user.id,
        email: user.email.clone(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use comanda_core::config::AppConfig;
    use comanda_core::MemoryUserStore;
    use std::sync::Arc;

    fn test_state() -> AppState {
        AppState::new(AppConfig::default(), Arc::new(MemoryUserStore::new()))
    }

    fn rotating_state() -> AppState {
        let mut config = AppConfig::default();
        config.auth.rotate_refresh_tokens = true;
        AppState::new(config, Arc::new(MemoryUserStore::new()))
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let state = test_state();
        let user = signup(&state, "Dana", "dana@example.com", "12345")
            .await
            .unwrap();
        assert_eq!(user.email, "dana@example.com");
        assert!(user.role.is_none());

        let pair = login(
            &state,
            "dana@example.com",
            "12345",
            None,
            Some("integration-test"),
        )
        .await
        .unwrap();
        let claims = state
            .codec
            .verify(&pair.access.token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.user_id, user.id);

        let history = state.store.login_history(user.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_agent.as_deref(), Some("integration-test"));
        assert_eq!(history[0].login_ip, DEFAULT_LOGIN_IP);
    }

    #[tokio::test]
    async fn test_login_records_client_ip() {
        let state = test_state();
        let user = signup(&state, "Dana", "dana@example.com", "12345")
            .await
            .unwrap();

        login(
            &state,
            "dana@example.com",
            "12345",
            Some("203.0.113.7"),
            None,
        )
        .await
        .unwrap();

        let history = state.store.login_history(user.id).await.unwrap();
        assert_eq!(history[0].login_ip, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let state = test_state();
        signup(&state, "Dana", "dana@example.com", "12345")
            .await
            .unwrap();

        let result = signup(&state, "Other", "dana@example.com", "54321").await;
        match result {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "User already exists"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let state = test_state();
        let result = login(&state, "nobody@example.com", "12345", None, None).await;
        assert!(matches!(result, Err(ApiError::IdentityNotFound)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = test_state();
        signup(&state, "Dana", "dana@example.com", "12345")
            .await
            .unwrap();

        let result = login(&state, "dana@example.com", "wrong", None, None).await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials(_))));

        // A failed login leaves no history entry.
        let user = state
            .store
            .user_by_email("dana@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(state.store.login_history(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_token() {
        let state = test_state();
        let user = signup(&state, "Dana", "dana@example.com", "12345")
            .await
            .unwrap();
        let pair = login(&state, "dana@example.com", "12345", None, None)
            .await
            .unwrap();

        let outcome = refresh(&state, &pair.refresh.token).await.unwrap();
        let claims = state
            .codec
            .verify(&outcome.access.token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.user_id, user.id);
        assert!(outcome.refresh.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let state = test_state();
        signup(&state, "Dana", "dana@example.com", "12345")
            .await
            .unwrap();
        let pair = login(&state, "dana@example.com", "12345", None, None)
            .await
            .unwrap();

        let result = refresh(&state, &pair.access.token).await;
        match result {
            Err(ApiError::InvalidToken(msg)) => assert_eq!(msg, "Invalid refresh token"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_rotation_mints_new_refresh_token() {
        let state = rotating_state();
        signup(&state, "Dana", "dana@example.com", "12345")
            .await
            .unwrap();
        let pair = login(&state, "dana@example.com", "12345", None, None)
            .await
            .unwrap();

        let outcome = refresh(&state, &pair.refresh.token).await.unwrap();
        let rotated = outcome.refresh.expect("rotation should mint a refresh token");
        let claims = state
            .codec
            .verify(&rotated.token, TokenKind::Refresh)
            .unwrap();
        assert_eq!(claims.token_type, "refresh");
    }

    #[tokio::test]
    async fn test_change_password_flow() {
        let state = test_state();
        let user = signup(&state, "Dana", "dana@example.com", "12345")
            .await
            .unwrap();

        let wrong = change_password(&state, user.id, "nope", "new-password").await;
        assert!(matches!(wrong, Err(ApiError::InvalidCredentials(_))));

        change_password(&state, user.id, "12345", "new-password")
            .await
            .unwrap();

        let old_login = login(&state, "dana@example.com", "12345", None, None).await;
        assert!(matches!(old_login, Err(ApiError::InvalidCredentials(_))));
        assert!(login(&state, "dana@example.com", "new-password", None, None)
            .await
            .is_ok());
    }
}
