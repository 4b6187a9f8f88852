use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog entry as its owner sees it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
    /// Unique identifier for the book
    pub id: String,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Free-form genre label
    pub genre: String,
    /// Owning user id
    pub user_id: String,
    /// Assigned by the store at insert time
    pub created_at: DateTime<Utc>,
}

/// Public listing entry. The owner appears by display name only; email
/// and owner id are never exposed here.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookWithOwner {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub created_at: DateTime<Utc>,
    pub owner_name: Option<String>,
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub genre: String,
}
