//! SQLite access for Shelf: pool construction, module migrations, and the
//! store-outcome taxonomy shared by every caller that needs to distinguish
//! "not found" from "constraint violated" from "unavailable".

use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Executor, SqlitePool};
use thiserror::Error;

use shelf_kernel::settings::DatabaseSettings;
use shelf_kernel::Migration;

/// Store failure, reduced to the outcomes callers branch on.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("row not found")]
    NotFound,

    #[error("unique constraint violated")]
    Conflict,

    #[error("store unavailable")]
    Unavailable(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err)
                if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                DbError::Conflict
            }
            _ => DbError::Unavailable(err),
        }
    }
}

/// Open a connection pool against the configured database.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
        .connect(&settings.url)
        .await
        .with_context(|| format!("failed to connect to database at {}", settings.url))?;

    tracing::info!(url = %settings.url, "database pool ready");
    Ok(pool)
}

/// Open an in-memory database for tests. A single connection keeps every
/// statement on the same in-memory instance.
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .with_context(|| "failed to open in-memory database")?;

    Ok(pool)
}

const MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    );
"#;

/// Apply module-contributed migrations that have not been recorded yet.
/// Input order must already be deterministic (the registry sorts it).
pub async fn migrate(
    pool: &SqlitePool,
    migrations: Vec<(String, Migration)>,
) -> anyhow::Result<()> {
    pool.execute(MIGRATIONS_TABLE)
        .await
        .with_context(|| "failed to create migrations table")?;

    for (module, migration) in migrations {
        let applied: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM _migrations WHERE module = ? AND id = ?")
                .bind(&module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("failed to read migration state for '{}'", module))?;

        if applied.is_some() {
            continue;
        }

        tracing::info!(module = %module, id = migration.id, "applying migration");

        pool.execute(migration.up)
            .await
            .with_context(|| format!("migration '{}/{}' failed", module, migration.id))?;

        sqlx::query("INSERT INTO _migrations (module, id) VALUES (?, ?)")
            .bind(&module)
            .bind(migration.id)
            .execute(pool)
            .await
            .with_context(|| format!("failed to record migration '{}/{}'", module, migration.id))?;
    }

    Ok(())
}
