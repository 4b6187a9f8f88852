//! Book queries. Ordering is newest-first; the id tiebreaker keeps
//! same-second inserts stable (ids are time-ordered UUIDs).

use sqlx::SqlitePool;
use uuid::Uuid;

use shelf_db::DbError;

use super::models::{Book, BookWithOwner};

const BOOK_COLUMNS: &str = "id, title, author, genre, user_id, created_at";

pub async fn insert(
    pool: &SqlitePool,
    title: &str,
    author: &str,
    genre: &str,
    owner_id: &str,
) -> Result<Book, DbError> {
    let query = format!(
        "INSERT INTO books (id, title, author, genre, user_id) VALUES (?, ?, ?, ?, ?) \
         RETURNING {BOOK_COLUMNS}"
    );
    sqlx::query_as::<_, Book>(&query)
        .bind(Uuid::now_v7().to_string())
        .bind(title)
        .bind(author)
        .bind(genre)
        .bind(owner_id)
        .fetch_one(pool)
        .await
        .map_err(DbError::from)
}

pub async fn list_by_owner(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Book>, DbError> {
    let query = format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    );
    sqlx::query_as::<_, Book>(&query)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .map_err(DbError::from)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<BookWithOwner>, DbError> {
    sqlx::query_as::<_, BookWithOwner>(
        "SELECT b.id, b.title, b.author, b.genre, b.created_at, u.name AS owner_name \
         FROM books b JOIN users u ON u.id = b.user_id \
         ORDER BY b.created_at DESC, b.id DESC",
    )
    .fetch_all(pool)
    .await
    .map_err(DbError::from)
}

pub async fn find_with_owner(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<BookWithOwner>, DbError> {
    sqlx::query_as::<_, BookWithOwner>(
        "SELECT b.id, b.title, b.author, b.genre, b.created_at, u.name AS owner_name \
         FROM books b JOIN users u ON u.id = b.user_id \
         WHERE b.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(DbError::from)
}

/// Ownership is re-checked atomically with the delete; there is no window
/// between a read and the removal. Zero rows means absent or not yours.
pub async fn delete_owned(pool: &SqlitePool, id: &str, owner_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM books WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await
        .map_err(DbError::from)?;

    Ok(result.rows_affected() > 0)
}
