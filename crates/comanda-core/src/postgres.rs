//! PostgreSQL user store
//!
//! Identity persistence over SQLx: users, roles, and login history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::{LoginHistory, NewUser, Result, Role, StoreError, User, UserStore};

/// PostgreSQL-backed [`UserStore`]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Connect using the database section of the application config
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.postgres_pool_size)
            .connect(&config.postgres_url)
            .await
            .map_err(|e| StoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the identity tables when they do not exist yet
    ///
    /// Role names are unique case-insensitively (index on `LOWER(name)`).
    /// Removing a role keeps its users (`SET NULL`); removing a user drops
    /// their login history (`CASCADE`).
    pub async fn init_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS roles (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL
            )
            "#,
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS roles_name_lower_idx
                ON roles (LOWER(name))
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                first_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role_id UUID REFERENCES roles(id) ON DELETE SET NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS login_history (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                login_ip TEXT NOT NULL DEFAULT '0.0.0.0',
                login_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                user_agent TEXT
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Schema init failed: {e}")))?;
        }

        Ok(())
    }

    async fn role_by_id(&self, id: Uuid) -> Result<Option<Role>> {
        let row: Option<RoleRow> =
            sqlx::query_as("SELECT id, name, description FROM roles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to get role: {e}")))?;

        Ok(row.map(Role::from))
    }
}

/// User row joined with its role
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    email: String,
    password_hash: String,
    role_id: Option<Uuid>,
    role_name: Option<String>,
    role_description: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = match (row.role_id, row.role_name, row.role_description) {
            (Some(id), Some(name), Some(description)) => Some(Role {
                id,
                name,
                description,
            }),
            _ => None,
        };

        User {
            id: row.id,
            first_name: row.first_name,
            email: row.email,
            password_hash: row.password_hash,
            role,
        }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: String,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(Debug, FromRow)]
struct LoginHistoryRow {
    id: Uuid,
    user_id: Uuid,
    login_ip: String,
    login_time: DateTime<Utc>,
    user_agent: Option<String>,
}

impl From<LoginHistoryRow> for LoginHistory {
    fn from(row: LoginHistoryRow) -> Self {
        LoginHistory {
            id: row.id,
            user_id: row.user_id,
            login_ip: row.login_ip,
            login_time: row.login_time,
            user_agent: row.user_agent,
        }
    }
}

const USER_SELECT: &str = r#"
    SELECT u.id, u.first_name, u.email, u.password_hash,
           r.id AS role_id, r.name AS role_name, r.description AS role_description
    FROM users u
    LEFT JOIN roles r ON r.id = u.role_id
"#;

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&user.first_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::EmailAlreadyExists
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::RoleNotFound
            }
            _ => StoreError::Database(format!("Failed to create user: {e}")),
        })?;

        let role = match user.role_id {
            Some(role_id) => self.role_by_id(role_id).await?,
            None => None,
        };

        Ok(User {
            id,
            first_name: user.first_name,
            email: user.email,
            password_hash: user.password_hash,
            role,
        })
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("{USER_SELECT} WHERE u.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to get user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("{USER_SELECT} WHERE u.email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to get user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("{USER_SELECT} ORDER BY u.email"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to list users: {e}")))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to update password: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }

        Ok(())
    }

    async fn set_user_role(&self, id: Uuid, role_id: Option<Uuid>) -> Result<User> {
        let result = sqlx::query("UPDATE users SET role_id = $2 WHERE id = $1")
            .bind(id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    StoreError::RoleNotFound
                }
                _ => StoreError::Database(format!("Failed to set role: {e}")),
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }

        self.user_by_id(id).await?.ok_or(StoreError::UserNotFound)
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to delete user: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }

        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let row: Option<RoleRow> = sqlx::query_as(
            "SELECT id, name, description FROM roles WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to get role: {e}")))?;

        Ok(row.map(Role::from))
    }

    async fn ensure_role(&self, name: &str, description: &str) -> Result<Role> {
        if let Some(role) = self.role_by_name(name).await? {
            return Ok(role);
        }

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to create role: {e}")))?;

        self.role_by_name(name).await?.ok_or(StoreError::RoleNotFound)
    }

    async fn record_login(
        &self,
        user_id: Uuid,
        login_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginHistory> {
        let entry = LoginHistory {
            id: Uuid::new_v4(),
            user_id,
            login_ip: login_ip.to_string(),
            login_time: Utc::now(),
            user_agent: user_agent.map(str::to_string),
        };

        sqlx::query(
            r#"
            INSERT INTO login_history (id, user_id, login_ip, login_time, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.login_ip)
        .bind(entry.login_time)
        .bind(&entry.user_agent)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to record login: {e}")))?;

        Ok(entry)
    }

    async fn login_history(&self, user_id: Uuid) -> Result<Vec<LoginHistory>> {
        let rows: Vec<LoginHistoryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, login_ip, login_time, user_agent
            FROM login_history
            WHERE user_id = $1
            ORDER BY login_time
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to get login history: {e}")))?;

        Ok(rows.into_iter().map(LoginHistory::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Ping failed: {e}")))?;

        Ok(())
    }
}
