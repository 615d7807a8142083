//! In-memory user store
//!
//! Same contract as the PostgreSQL store, held in process memory. Backs the
//! integration test suite and database-less development runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{LoginHistory, NewUser, Result, Role, StoreError, User, UserStore};

/// In-memory [`UserStore`]
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, StoredUser>,
    roles: HashMap<Uuid, Role>,
    history: Vec<LoginHistory>,
}

#[derive(Clone)]
struct StoredUser {
    id: Uuid,
    first_name: String,
    email: String,
    password_hash: String,
    role_id: Option<Uuid>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn materialize(&self, stored: &StoredUser) -> User {
        let role = stored
            .role_id
            .and_then(|role_id| self.roles.get(&role_id).cloned());

        User {
            id: stored.id,
            first_name: stored.first_name.clone(),
            email: stored.email.clone(),
            password_hash: stored.password_hash.clone(),
            role,
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.inner.write().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::EmailAlreadyExists);
        }
        if let Some(role_id) = user.role_id {
            if !tables.roles.contains_key(&role_id) {
                return Err(StoreError::RoleNotFound);
            }
        }

        let stored = StoredUser {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            email: user.email,
            password_hash: user.password_hash,
            role_id: user.role_id,
        };
        let materialized = tables.materialize(&stored);
        tables.users.insert(stored.id, stored);

        Ok(materialized)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.get(&id).map(|u| tables.materialize(u)))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email == email)
            .map(|u| tables.materialize(u)))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.inner.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .map(|u| tables.materialize(u))
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut tables = self.inner.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_user_role(&self, id: Uuid, role_id: Option<Uuid>) -> Result<User> {
        let mut tables = self.inner.write().await;

        if let Some(role_id) = role_id {
            if !tables.roles.contains_key(&role_id) {
                return Err(StoreError::RoleNotFound);
            }
        }

        let user = tables.users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        user.role_id = role_id;
        let stored = user.clone();

        Ok(tables.materialize(&stored))
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(StoreError::UserNotFound);
        }
        tables.history.retain(|entry| entry.user_id != id);
        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let tables = self.inner.read().await;
        Ok(tables
            .roles
            .values()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn ensure_role(&self, name: &str, description: &str) -> Result<Role> {
        let mut tables = self.inner.write().await;

        if let Some(role) = tables
            .roles
            .values()
            .find(|r| r.name.eq_ignore_ascii_case(name))
        {
            return Ok(role.clone());
        }

        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
        };
        tables.roles.insert(role.id, role.clone());

        Ok(role)
    }

    async fn record_login(
        &self,
        user_id: Uuid,
        login_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginHistory> {
        let mut tables = self.inner.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound);
        }

        let entry = LoginHistory {
            id: Uuid::new_v4(),
            user_id,
            login_ip: login_ip.to_string(),
            login_time: Utc::now(),
            user_agent: user_agent.map(str::to_string),
        };
        tables.history.push(entry.clone());

        Ok(entry)
    }

    async fn login_history(&self, user_id: Uuid) -> Result<Vec<LoginHistory>> {
        let tables = self.inner.read().await;
        let mut entries: Vec<LoginHistory> = tables
            .history
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.login_time);
        Ok(entries)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
