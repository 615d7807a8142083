//! Comanda Core - Identity models, storage traits, and shared types
//!
//! This crate defines the core abstractions used throughout the Comanda
//! backend:
//! - Identity models (users, roles, login history)
//! - The `UserStore` persistence seam with PostgreSQL and in-memory backends
//! - Common error types
//! - Configuration management

pub mod config;
pub mod memory;
pub mod postgres;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by user store backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Role not found")]
    RoleNotFound,
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Identity Models
// ============================================================================

/// A named staff role
///
/// Role names are unique case-insensitively; store lookups fold case before
/// comparing. Three roles are seeded at startup: `admin`, `waiter`, `user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier
    pub id: Uuid,

    /// Role name (e.g. "admin", "waiter")
    pub name: String,

    /// Human-readable description
    pub description: String,
}

/// A registered account: customer by default, staff when a role is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,

    /// Given name
    pub first_name: String,

    /// Email address, unique per account, used as the login identifier
    pub email: String,

    /// Argon2 PHC hash of the password; never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Optional staff role; `None` means regular customer
    pub role: Option<Role>,
}

impl User {
    /// Name of the user's role, if any
    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }

    /// Check whether the user's role matches `name`, ignoring case
    pub fn has_role(&self, name: &str) -> bool {
        self.role_name()
            .is_some_and(|r| r.eq_ignore_ascii_case(name))
    }
}

/// Payload for inserting a user record
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Option<Uuid>,
}

/// One successful login, recorded before any tokens are minted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginHistory {
    /// Unique identifier
    pub id: Uuid,

    /// Owning user; rows are removed with the user
    pub user_id: Uuid,

    /// Client address; `0.0.0.0` when it could not be determined
    pub login_ip: String,

    /// When the login happened
    pub login_time: DateTime<Utc>,

    /// Client user agent, when the header was present
    pub user_agent: Option<String>,
}

// ============================================================================
// Storage Trait
// ============================================================================

/// Persistence seam for identity data
///
/// Implemented by [`PgUserStore`] for production and [`MemoryUserStore`] for
/// tests and database-less development. Fetched users carry their role
/// materialized so callers never join by hand.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; [`StoreError::EmailAlreadyExists`] on a duplicate email
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Fetch a user by id
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Fetch a user by email
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users, ordered by email
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Replace a user's password hash
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;

    /// Assign or clear a user's role, returning the updated user
    async fn set_user_role(&self, id: Uuid, role_id: Option<Uuid>) -> Result<User>;

    /// Remove a user and, with them, their login history
    async fn delete_user(&self, id: Uuid) -> Result<()>;

    /// Case-insensitive role lookup
    async fn role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// Get-or-create a role; used by startup seeding
    async fn ensure_role(&self, name: &str, description: &str) -> Result<Role>;

    /// Append a login-history entry for a user
    async fn record_login(
        &self,
        user_id: Uuid,
        login_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginHistory>;

    /// A user's login history, oldest first
    async fn login_history(&self, user_id: Uuid) -> Result<Vec<LoginHistory>>;

    /// Connectivity probe for readiness checks
    async fn ping(&self) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: Option<Role>) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role,
        }
    }

    #[test]
    fn test_has_role_is_case_insensitive() {
        let role = Role {
            id: Uuid::new_v4(),
            name: "Waiter".to_string(),
            description: "Waiters can view and manage orders".to_string(),
        };
        let user = sample_user(Some(role));

        assert!(user.has_role("waiter"));
        assert!(user.has_role("WAITER"));
        assert!(!user.has_role("admin"));
    }

    #[test]
    fn test_has_role_without_role() {
        let user = sample_user(None);
        assert_eq!(user.role_name(), None);
        assert!(!user.has_role("admin"));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = sample_user(None);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ana@example.com");
    }
}
