pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;

use shelf_auth::session::SESSIONS_TABLE;
use shelf_auth::users::USERS_TABLE;
use shelf_auth::{IdentityProvider, SessionGate};
use shelf_kernel::{InitCtx, Migration, Module};

/// Shared state for the Auth module handlers.
#[derive(Clone, FromRef)]
pub struct AuthState {
    pub db: SqlitePool,
    pub gate: SessionGate,
    pub provider: Option<Arc<dyn IdentityProvider>>,
}

/// Auth module: signup, credential login, provider login, logout.
pub struct AuthModule {
    state: AuthState,
}

impl AuthModule {
    pub fn new(
        db: SqlitePool,
        gate: SessionGate,
        provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            state: AuthState { db, gate, provider },
        }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            federated = self.state.provider.is_some(),
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/signup", post(routes::signup))
            .route("/login", post(routes::login))
            .route("/logout", post(routes::logout))
            .route("/provider/redirect", get(routes::provider_redirect))
            .route("/provider/callback", get(routes::provider_callback))
            .route("/health", get(routes::health_check))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/signup": {
                    "post": {
                        "summary": "Create a password-based account",
                        "tags": ["Auth"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/SignupRequest"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created user",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/User"
                                        }
                                    }
                                }
                            },
                            "400": {
                                "description": "Missing email or password",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            },
                            "409": {
                                "description": "Email already registered",
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
                "/login": {
                    "post": {
                        "summary": "Log in with credentials",
                        "tags": ["Auth"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/LoginRequest"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Session issued",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/LoginResponse"
                                        }
                                    }
                                }
                            },
                            "401": {
                                "description": "Invalid credentials",
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
                "/logout": {
                    "post": {
                        "summary": "Invalidate the current session",
                        "tags": ["Auth"],
                        "responses": {
                            "200": {
                                "description": "Session revoked",
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
                                "description": "No session presented",
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
                "/provider/redirect": {
                    "get": {
                        "summary": "Redirect to the identity provider",
                        "tags": ["Auth"],
                        "responses": {
                            "303": {
                                "description": "Redirect to the provider authorize URL"
                            },
                            "400": {
                                "description": "No provider configured",
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
                "/provider/callback": {
                    "get": {
                        "summary": "Complete a provider login",
                        "tags": ["Auth"],
                        "parameters": [
                            {
                                "name": "code",
                                "in": "query",
                                "required": true,
                                "schema": {
                                    "type": "string"
                                }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "Session issued",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/LoginResponse"
                                        }
                                    }
                                }
                            },
                            "401": {
                                "description": "Exchange failed",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            },
                            "409": {
                                "description": "Email linked to a different identity",
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
                        "summary": "Auth health check",
                        "tags": ["Auth"],
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
                    "SignupRequest": {
                        "type": "object",
                        "properties": {
                            "name": {
                                "type": "string",
                                "nullable": true,
                                "description": "Display name"
                            },
                            "email": {
                                "type": "string",
                                "format": "email",
                                "description": "Unique email address"
                            },
                            "password": {
                                "type": "string",
                                "description": "Plaintext password, hashed server-side"
                            }
                        },
                        "required": ["email", "password"]
                    },
                    "LoginRequest": {
                        "type": "object",
                        "properties": {
                            "email": {
                                "type": "string",
                                "format": "email"
                            },
                            "password": {
                                "type": "string"
                            }
                        },
                        "required": ["email", "password"]
                    },
                    "User": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "string",
                                "description": "Unique identifier for the user"
                            },
                            "name": {
                                "type": "string",
                                "nullable": true,
                                "description": "Display name"
                            },
                            "email": {
                                "type": "string",
                                "format": "email",
                                "description": "User's email address"
                            }
                        },
                        "required": ["id", "email"]
                    },
                    "LoginResponse": {
                        "type": "object",
                        "properties": {
                            "token": {
                                "type": "string",
                                "description": "Session token; also set as a cookie"
                            },
                            "user": {
                                "$ref": "#/components/schemas/User"
                            }
                        },
                        "required": ["token", "user"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_users",
                up: USERS_TABLE,
            },
            Migration {
                id: "002_sessions",
                up: SESSIONS_TABLE,
            },
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module stopped");
        Ok(())
    }
}

/// Create a new instance of the auth module
pub fn create_module(
    db: SqlitePool,
    gate: SessionGate,
    provider: Option<Arc<dyn IdentityProvider>>,
) -> Arc<dyn Module> {
    Arc::new(AuthModule::new(db, gate, provider))
}
