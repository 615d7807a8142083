//! Security audit logging for authentication events
//!
//! Provides structured audit logging for authentication-related events
//! including signups, logins, token refreshes, and access control
//! failures.
//!
//! All audit events are logged at INFO level with the "audit" target,
//! making them easy to filter and route to security monitoring systems.
//!
//! # Architecture
//!
//! - Uses tracing for structured logging
//! - JSON-compatible format for log aggregators
//! - Separate target ("audit") for filtering
//!
//! # Example
//!
//! ```ignore
//! use comanda_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     email: user.email.clone(),
//!     ip_address: "192.168.1.1".to_string(),
//!     user_agent: Some("Mozilla/5.0...".to_string()),
//! });
//! ```
//!
//! Author: hephaex@gmail.com

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful account creation
    RegistrationSuccess { user_id: Uuid, email: String },

    /// Rejected account creation
    RegistrationFailure { email: String, reason: String },

    /// Successful user login
    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: String,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        email: String,
        reason: String,
        ip_address: String,
        user_agent: Option<String>,
    },

    /// Access token issued from a refresh token
    TokenRefresh {
        user_id: Uuid,
        email: String,
        rotated: bool,
    },

    /// Password change
    PasswordChange { user_id: Uuid, email: String },

    /// Request rejected at the authentication gate
    InvalidToken {
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Authenticated request rejected by a role gate
    AccessDenied {
        user_id: Uuid,
        email: String,
        resource: String,
        required_role: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// An administrator assigned or cleared a user's role
    RoleAssigned {
        user_id: Uuid,
        role: Option<String>,
    },

    /// An administrator removed an account
    UserRemoved { user_id: Uuid, email: String },
}

/// Log a security audit event with structured fields
///
/// Events are logged at INFO level with the "audit" target, making them
/// easy to filter and route separately from application logs. The full
/// event is also serialized to JSON for log aggregators.
pub fn audit_log(event: &AuditEvent) {
    // Serialize event to JSON for structured logging
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::RegistrationSuccess { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "Registration successful"
            );
        }
        AuditEvent::RegistrationFailure { email, reason } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                "Registration failed"
            );
        }
        AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = %ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = %ip_address,
                "Login failed"
            );
        }
        AuditEvent::TokenRefresh {
            user_id,
            email,
            rotated,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                rotated = %rotated,
                "Token refresh"
            );
        }
        AuditEvent::PasswordChange { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "Password changed"
            );
        }
        AuditEvent::InvalidToken {
            reason, ip_address, ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                reason = %reason,
                ip_address = ?ip_address,
                "Invalid token"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            email,
            resource,
            required_role,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                resource = %resource,
                required_role = %required_role,
                ip_address = ?ip_address,
                "Access denied"
            );
        }
        AuditEvent::RoleAssigned { user_id, role } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                role = ?role,
                "Role assigned"
            );
        }
        AuditEvent::UserRemoved { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "User removed"
            );
        }
    }
}

/// Extract the client IP address from request headers
///
/// Checks X-Forwarded-For (first hop) and X-Real-IP. Returns `None`
/// when neither is present; callers fall back to their own default.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    // X-Forwarded-For carries the whole proxy chain; the client is first.
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Extract the user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            ip_address: "192.168.1.1".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("login_success"));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::LoginFailure {
            email: "test@example.com".to_string(),
            reason: "Invalid password".to_string(),
            ip_address: "192.168.1.1".to_string(),
            user_agent: Some("Test Agent".to_string()),
        });

        audit_log(&AuditEvent::AccessDenied {
            user_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            resource: "/api/v1/admin/users".to_string(),
            required_role: "admin".to_string(),
            ip_address: None,
            user_agent: None,
        });

        audit_log(&AuditEvent::RoleAssigned {
            user_id: Uuid::new_v4(),
            role: None,
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        let ip = extract_ip_address(&headers);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        let ip = extract_ip_address(&headers);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_user_agent() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            axum::http::header::USER_AGENT,
            "Mozilla/5.0 (Test)".parse().unwrap(),
        );

        let ua = extract_user_agent(&headers);
        assert_eq!(ua, Some("Mozilla/5.0 (Test)".to_string()));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();

        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}
