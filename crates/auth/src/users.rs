//! User rows and the queries identity reconciliation runs against them.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use shelf_db::DbError;

/// Schema contributed to the auth module's migrations. The unique indexes
/// on `email` and `provider_account_id` are what close the
/// check-then-act races in reconciliation; SQLite treats NULLs as
/// distinct, so provider-less rows coexist.
pub const USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id                  TEXT NOT NULL PRIMARY KEY,
        name                TEXT,
        email               TEXT NOT NULL,
        password_hash       TEXT,
        provider            TEXT,
        provider_account_id TEXT,
        created_at          TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE UNIQUE INDEX IF NOT EXISTS users_email_unique ON users(email);
    CREATE UNIQUE INDEX IF NOT EXISTS users_provider_account_unique
        ON users(provider_account_id);
"#;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, provider, provider_account_id, created_at";

/// Durable identity record. `password_hash` is absent for provider-only
/// accounts; `provider`/`provider_account_id` are absent until a federated
/// identity is attached.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: Option<String>,
    pub provider_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, DbError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    sqlx::query_as::<_, User>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(DbError::from)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, DbError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(DbError::from)
}

/// Insert a password-based account. A duplicate email surfaces as
/// [`DbError::Conflict`] from the unique index, never as a second row.
pub async fn insert_password_user(
    pool: &SqlitePool,
    name: Option<&str>,
    email: &str,
    password_hash: &str,
) -> Result<User, DbError> {
    let query = format!(
        "INSERT INTO users (id, name, email, password_hash) VALUES (?, ?, ?, ?) \
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, User>(&query)
        .bind(Uuid::now_v7().to_string())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(DbError::from)
}

/// Insert a provider-only account (no password hash on file).
pub async fn insert_provider_user(
    pool: &SqlitePool,
    name: Option<&str>,
    email: &str,
    provider: &str,
    provider_account_id: &str,
) -> Result<User, DbError> {
    let query = format!(
        "INSERT INTO users (id, name, email, provider, provider_account_id) \
         VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, User>(&query)
        .bind(Uuid::now_v7().to_string())
        .bind(name)
        .bind(email)
        .bind(provider)
        .bind(provider_account_id)
        .fetch_one(pool)
        .await
        .map_err(DbError::from)
}

/// Attach a provider identity to an account that has none. The
/// `provider_account_id IS NULL` guard makes the attach atomic with the
/// check; a concurrent attach leaves this one affecting zero rows.
pub async fn attach_provider(
    pool: &SqlitePool,
    user_id: &str,
    provider: &str,
    provider_account_id: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE users SET provider = ?, provider_account_id = ? \
         WHERE id = ? AND provider_account_id IS NULL",
    )
    .bind(provider)
    .bind(provider_account_id)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(DbError::from)?;

    Ok(result.rows_affected() > 0)
}
