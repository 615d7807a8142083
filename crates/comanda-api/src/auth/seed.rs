//! Startup seeding of roles and default staff accounts
//!
//! Roles are created unconditionally so role gates always have
//! something to resolve against. The default staff accounts are only
//! created when enabled in config, and never overwrite existing rows,
//! so a production deployment that has rotated their passwords is left
//! alone.

use crate::auth::password::hash_password;
use crate::error::ApiError;
use comanda_core::{NewUser, StoreError, UserStore};
use uuid::Uuid;

/// Initial password for the seeded staff accounts. A development
/// convenience, expected to be changed through the API on first login.
const DEFAULT_STAFF_PASSWORD: &str = "12345";

/// Create the built-in roles and, when enabled, the default staff
/// accounts. Safe to run on every startup.
pub async fn seed(store: &dyn UserStore, seed_default_users: bool) -> Result<(), ApiError> {
    let admin_role = store
        .ensure_role("admin", "Admin users have all permissions")
        .await?;
    let waiter_role = store
        .ensure_role("waiter", "Waiters can view and manage orders")
        .await?;
    store
        .ensure_role(
            "user",
            "Regular user or customer role, default one, does not require any extra configuration",
        )
        .await?;

    if !seed_default_users {
        return Ok(());
    }

    ensure_staff_account(store, "admin@gmail.com", "Admin", admin_role.id).await?;
    ensure_staff_account(store, "waiter@gmail.com", "Waiter", waiter_role.id).await?;
    Ok(())
}

/// Create one staff account unless it already exists. A concurrent
/// instance winning the insert race counts as existing.
async fn ensure_staff_account(
    store: &dyn UserStore,
    email: &str,
    first_name: &str,
    role_id: Uuid,
) -> Result<(), ApiError> {
    if store.user_by_email(email).await?.is_some() {
        return Ok(());
    }

    let password_hash =
        hash_password(DEFAULT_STAFF_PASSWORD).map_err(|e| ApiError::Storage(e.to_string()))?;
    let created = store
        .create_user(NewUser {
            first_name: first_name.to_string(),
            email: email.to_string(),
            password_hash,
            role_id: Some(role_id),
        })
        .await;

    match created {
        Ok(user) => {
            tracing::info!(email = %user.email, "seeded default staff account");
            Ok(())
        }
        Err(StoreError::EmailAlreadyExists) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use comanda_core::MemoryUserStore;

    #[tokio::test]
    async fn test_seed_creates_roles_and_staff() {
        let store = MemoryUserStore::new();
        seed(&store, true).await.unwrap();

        let admin_role = store.role_by_name("admin").await.unwrap().unwrap();
        assert_eq!(admin_role.description, "Admin users have all permissions");
        assert!(store.role_by_name("waiter").await.unwrap().is_some());
        assert!(store.role_by_name("user").await.unwrap().is_some());

        let admin = store
            .user_by_email("admin@gmail.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.has_role("admin"));
        assert!(verify_password("12345", &admin.password_hash).unwrap());

        let waiter = store
            .user_by_email("waiter@gmail.com")
            .await
            .unwrap()
            .unwrap();
        assert!(waiter.has_role("waiter"));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryUserStore::new();
        seed(&store, true).await.unwrap();

        let admin_before = store
            .user_by_email("admin@gmail.com")
            .await
            .unwrap()
            .unwrap();

        seed(&store, true).await.unwrap();

        let admin_after = store
            .user_by_email("admin@gmail.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin_before.id, admin_after.id);
        assert_eq!(admin_before.password_hash, admin_after.password_hash);
        assert_eq!(store.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_without_default_users() {
        let store = MemoryUserStore::new();
        seed(&store, false).await.unwrap();

        assert!(store.role_by_name("admin").await.unwrap().is_some());
        assert!(store.list_users().await.unwrap().is_empty());
    }
}
