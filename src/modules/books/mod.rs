pub mod models;
pub mod repo;
pub mod routes;

use async_trait::async_trait;
use axum::extract::FromRef;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;

use shelf_auth::SessionGate;
use shelf_kernel::{InitCtx, Migration, Module};

/// Shared state for the Books module handlers.
#[derive(Clone, FromRef)]
pub struct BooksState {
    pub db: SqlitePool,
    pub gate: SessionGate,
}

/// Books module: the per-user catalogue plus its public listing.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(db: SqlitePool, gate: SessionGate) -> Self {
        Self {
            state: BooksState { db, gate },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(routes::list_own).post(routes::create))
            .route("/all", get(routes::list_all))
            .route("/health", get(routes::health_check))
            .route("/{id}", get(routes::get_one).delete(routes::delete))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List the authenticated user's books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Books owned by the caller, newest first",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {
                                                "$ref": "#/components/schemas/Book"
                                            }
                                        }
                                    }
                                }
                            },
                            "401": {
                                "description": "Missing or invalid session",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/CreateBook"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/Book"
                                        }
                                    }
                                }
                            },
                            "400": {
                                "description": "Missing required fields",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            },
                            "401": {
                                "description": "Missing or invalid session",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/all": {
                    "get": {
                        "summary": "Public listing of all books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books, annotated with owner display names",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {
                                                "$ref": "#/components/schemas/BookWithOwner"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Fetch a single book",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/BookWithOwner"
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "No such book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "delete": {
                        "summary": "Delete an owned book",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Deleted",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "message": {
                                                    "type": "string"
                                                }
                                            }
                                        }
                                    }
                                }
                            },
                            "401": {
                                "description": "Missing or invalid session",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "Absent, or owned by another user",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": {
                                    "text/plain": {
                                        "schema": {
                                            "type": "string"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "string",
                                "description": "Unique identifier for the book"
                            },
                            "title": {
                                "type": "string",
                                "description": "Title of the book"
                            },
                            "author": {
                                "type": "string",
                                "description": "Author of the book"
                            },
                            "genre": {
                                "type": "string",
                                "description": "Free-form genre label"
                            },
                            "user_id": {
                                "type": "string",
                                "description": "Owning user id"
                            },
                            "created_at": {
                                "type": "string",
                                "format": "date-time",
                                "description": "When the book was added"
                            }
                        },
                        "required": ["id", "title", "author", "genre", "user_id", "created_at"]
                    },
                    "BookWithOwner": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "string",
                                "description": "Unique identifier for the book"
                            },
                            "title": {
                                "type": "string",
                                "description": "Title of the book"
                            },
                            "author": {
                                "type": "string",
                                "description": "Author of the book"
                            },
                            "genre": {
                                "type": "string",
                                "description": "Free-form genre label"
                            },
                            "created_at": {
                                "type": "string",
                                "format": "date-time",
                                "description": "When the book was added"
                            },
                            "owner_name": {
                                "type": "string",
                                "nullable": true,
                                "description": "Owner display name; never the email"
                            }
                        },
                        "required": ["id", "title", "author", "genre", "created_at"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": {
                                "type": "string",
                                "description": "Title of the book"
                            },
                            "author": {
                                "type": "string",
                                "description": "Author of the book"
                            },
                            "genre": {
                                "type": "string",
                                "description": "Free-form genre label"
                            }
                        },
                        "required": ["title", "author", "genre"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id         TEXT NOT NULL PRIMARY KEY,
                    title      TEXT NOT NULL,
                    author     TEXT NOT NULL,
                    genre      TEXT NOT NULL,
                    user_id    TEXT NOT NULL REFERENCES users(id),
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );
                CREATE INDEX IF NOT EXISTS books_user_idx ON books(user_id);
                CREATE INDEX IF NOT EXISTS books_created_idx ON books(created_at);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(db: SqlitePool, gate: SessionGate) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(db, gate))
}
