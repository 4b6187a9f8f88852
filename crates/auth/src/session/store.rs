//! Store-backed sessions: an opaque random token keyed to a row that
//! carries the user id and expiry.

use anyhow::anyhow;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use shelf_db::DbError;

use super::{SessionStrategy, SessionToken};
use crate::error::AuthError;

pub const SESSIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token      TEXT NOT NULL PRIMARY KEY,
        user_id    TEXT NOT NULL REFERENCES users(id),
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS sessions_user_idx ON sessions(user_id);
"#;

pub struct StoreSessions {
    pool: SqlitePool,
    ttl_secs: u64,
}

impl StoreSessions {
    pub fn new(pool: SqlitePool, ttl_secs: u64) -> Self {
        Self { pool, ttl_secs }
    }
}

// 256-bit random token, base64url without padding
fn generate_token() -> Result<String, AuthError> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| AuthError::Crypto(anyhow!(e.to_string())))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

#[async_trait]
impl SessionStrategy for StoreSessions {
    async fn issue(&self, user_id: &str) -> Result<SessionToken, AuthError> {
        let token = generate_token()?;
        let expires_at = Utc::now() + Duration::seconds(self.ttl_secs as i64);

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        tracing::debug!(user_id = %user_id, ttl_secs = self.ttl_secs, "session issued");
        Ok(token)
    }

    async fn validate(&self, token: &str) -> Result<Option<String>, AuthError> {
        let row: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;

        let Some((user_id, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= Utc::now() {
            // Prune the expired row on observation.
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;
            return Ok(None);
        }

        Ok(Some(user_id))
    }

    async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(result.rows_affected() > 0)
    }
}
