//! HTTP handlers for the Books module.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use shelf_auth::CurrentUser;
use shelf_db::DbError;
use shelf_http::error::AppError;

use super::models::{Book, BookWithOwner, CreateBook};
use super::repo;
use super::BooksState;

fn store_fault(err: DbError) -> AppError {
    AppError::Internal(anyhow::Error::new(err))
}

/// List the authenticated user's books, newest first.
pub async fn list_own(
    State(state): State<BooksState>,
    user: CurrentUser,
) -> Result<Json<Vec<Book>>, AppError> {
    let books = repo::list_by_owner(&state.db, &user.user_id)
        .await
        .map_err(store_fault)?;
    Ok(Json(books))
}

/// Public listing of every book, annotated with owner display names.
pub async fn list_all(
    State(state): State<BooksState>,
) -> Result<Json<Vec<BookWithOwner>>, AppError> {
    let books = repo::list_all(&state.db).await.map_err(store_fault)?;
    Ok(Json(books))
}

/// Create a book owned by the authenticated user.
pub async fn create(
    State(state): State<BooksState>,
    user: CurrentUser,
    Json(payload): Json<CreateBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let title = payload.title.trim();
    let author = payload.author.trim();
    let genre = payload.genre.trim();

    let mut details = Vec::new();
    for (field, value) in [("title", title), ("author", author), ("genre", genre)] {
        if value.is_empty() {
            details.push(json!({"field": field, "error": "required"}));
        }
    }
    if !details.is_empty() {
        return Err(AppError::validation(
            details,
            "title, author, and genre are required",
        ));
    }

    let book = repo::insert(&state.db, title, author, genre, &user.user_id)
        .await
        .map_err(store_fault)?;

    tracing::info!(book_id = %book.id, user_id = %user.user_id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// Public single-book lookup.
pub async fn get_one(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Json<BookWithOwner>, AppError> {
    match repo::find_with_owner(&state.db, &id)
        .await
        .map_err(store_fault)?
    {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::not_found("book not found")),
    }
}

/// Delete an owned book. A book owned by someone else reports the same
/// not-found as a book that does not exist.
pub async fn delete(
    State(state): State<BooksState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = repo::delete_owned(&state.db, &id, &user.user_id)
        .await
        .map_err(store_fault)?;

    if deleted {
        tracing::info!(book_id = %id, user_id = %user.user_id, "book deleted");
        Ok(Json(json!({"message": "book deleted"})))
    } else {
        Err(AppError::not_found("book not found"))
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "books module is healthy"
}
