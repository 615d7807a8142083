//! Authentication and authorization module
//!
//! This module provides JWT-based authentication with the following components:
//! - Dual-secret token minting and verification
//! - Password hashing with Argon2
//! - Middleware gates for authentication and role checks
//! - Account and session flows behind the HTTP handlers
//! - Startup seeding of roles and default staff accounts

pub mod middleware;
pub mod password;
pub mod seed;
pub mod service;
pub mod token;

pub use middleware::{auth_middleware, require_role, AuthenticatedUser};
pub use password::{hash_password, verify_password, PasswordError};
pub use service::{change_password, login, refresh, signup, RefreshOutcome, TokenPair};
pub use token::{Claims, MintedToken, TokenCodec, TokenError, TokenIdentity, TokenKind};
