//! HTTP handlers for the Auth module.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Redirect;
use axum::Json;
use serde_json::json;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use shelf_auth::extract::token_from;
use shelf_auth::reconcile::{self, NewUser};
use shelf_auth::SessionGate;
use shelf_http::error::AppError;

use super::models::{CallbackParams, LoginRequest, LoginResponse, SignupRequest, UserResponse};
use super::AuthState;

fn set_session_cookie(cookies: &Cookies, gate: &SessionGate, token: &str) {
    let cookie = Cookie::build((gate.cookie_name().to_string(), token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookies.add(cookie);
}

fn clear_session_cookie(cookies: &Cookies, gate: &SessionGate) {
    let cookie = Cookie::build((gate.cookie_name().to_string(), String::new()))
        .path("/")
        .build();
    cookies.remove(cookie);
}

/// Create a password-based account.
pub async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let email = payload.email.trim();
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let mut details = Vec::new();
    if email.is_empty() {
        details.push(json!({"field": "email", "error": "required"}));
    }
    if payload.password.is_empty() {
        details.push(json!({"field": "password", "error": "required"}));
    }
    if !details.is_empty() {
        return Err(AppError::validation(
            details,
            "email and password are required",
        ));
    }

    let new_user = NewUser {
        name: name.map(str::to_string),
        email: email.to_string(),
        password: payload.password,
    };
    let user = reconcile::sign_up(&state.db, &new_user).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Resolve credentials to a session.
pub async fn login(
    State(state): State<AuthState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = payload.email.trim();
    // Absent fields read the same as wrong ones.
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::unauthorized("invalid email or password"));
    }

    let user = reconcile::authenticate(&state.db, email, &payload.password).await?;
    let token = state.gate.issue(&user.id).await?;
    set_session_cookie(&cookies, &state.gate, &token);

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// Invalidate the presented session and clear its cookie.
pub async fn logout(
    State(state): State<AuthState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(token) = token_from(&headers, &cookies, state.gate.cookie_name()) else {
        return Err(AppError::unauthorized("authentication required"));
    };

    state.gate.logout(&token).await?;
    clear_session_cookie(&cookies, &state.gate);

    Ok(Json(json!({"message": "logged out"})))
}

/// Send the user agent to the identity provider.
pub async fn provider_redirect(State(state): State<AuthState>) -> Result<Redirect, AppError> {
    let provider = state
        .provider
        .as_ref()
        .ok_or_else(|| AppError::bad_request("identity provider not configured"))?;

    let url = provider.authorize_url()?;
    Ok(Redirect::to(url.as_str()))
}

/// Complete a provider login: exchange the code, reconcile the verified
/// identity to a user, and issue a session exactly like `/login`.
pub async fn provider_callback(
    State(state): State<AuthState>,
    cookies: Cookies,
    Query(params): Query<CallbackParams>,
) -> Result<Json<LoginResponse>, AppError> {
    let provider = state
        .provider
        .as_ref()
        .ok_or_else(|| AppError::bad_request("identity provider not configured"))?;

    let identity = provider.exchange(&params.code).await?;
    let user = reconcile::reconcile_provider(&state.db, &identity).await?;
    let token = state.gate.issue(&user.id).await?;
    set_session_cookie(&cookies, &state.gate, &token);

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "auth module is healthy"
}
