//! The per-request authorization gate: recover the user id from the
//! presented token, or reject before any resource access.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap};
use sqlx::SqlitePool;
use tower_cookies::Cookies;

use shelf_kernel::settings::{AuthSettings, SessionStrategyKind};
use shelf_http::error::AppError;

use crate::error::AuthError;
use crate::session::{SessionStrategy, SessionToken, SignedSessions, StoreSessions};

/// The configured session strategy plus the cookie it travels in.
/// Cloned into every module state that gates requests.
#[derive(Clone)]
pub struct SessionGate {
    strategy: Arc<dyn SessionStrategy>,
    cookie_name: String,
}

impl SessionGate {
    pub fn new(strategy: Arc<dyn SessionStrategy>, cookie_name: impl Into<String>) -> Self {
        Self {
            strategy,
            cookie_name: cookie_name.into(),
        }
    }

    /// Build the gate from configuration. The strategy is fixed here for
    /// the process lifetime.
    pub fn from_settings(auth: &AuthSettings, pool: &SqlitePool) -> anyhow::Result<Self> {
        let strategy: Arc<dyn SessionStrategy> = match auth.session.strategy {
            SessionStrategyKind::Store => {
                Arc::new(StoreSessions::new(pool.clone(), auth.session.ttl_secs))
            }
            SessionStrategyKind::Signed => {
                anyhow::ensure!(
                    !auth.session.secret.is_empty(),
                    "auth.session.secret must be set for the signed session strategy"
                );
                Arc::new(SignedSessions::new(
                    auth.session.secret.as_bytes(),
                    auth.session.ttl_secs,
                ))
            }
        };

        Ok(Self::new(strategy, auth.session.cookie_name.clone()))
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub async fn issue(&self, user_id: &str) -> Result<SessionToken, AuthError> {
        self.strategy.issue(user_id).await
    }

    pub async fn validate(&self, token: &str) -> Result<Option<String>, AuthError> {
        self.strategy.validate(token).await
    }

    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        self.strategy.logout(token).await
    }
}

/// Authenticated caller, recovered from the request's bearer header or
/// session cookie. The id is bound by the token; request fields can never
/// override it.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

/// Read the session token from a request: bearer header first, session
/// cookie as fallback.
pub fn token_from(headers: &HeaderMap, cookies: &Cookies, cookie_name: &str) -> Option<String> {
    bearer_token(headers).or_else(|| {
        cookies
            .get(cookie_name)
            .map(|cookie| cookie.value().to_string())
    })
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SessionGate: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = SessionGate::from_ref(state);

        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::unauthorized("authentication required"))?;

        let Some(token) = token_from(&parts.headers, &cookies, gate.cookie_name()) else {
            return Err(AppError::unauthorized("authentication required"));
        };

        match gate.validate(&token).await.map_err(AppError::from)? {
            Some(user_id) => Ok(CurrentUser { user_id }),
            None => Err(AppError::unauthorized("authentication required")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn signed_strategy_requires_a_secret() {
        let pool = shelf_db::connect_in_memory().await.unwrap();
        let mut auth = AuthSettings::default();
        auth.session.strategy = SessionStrategyKind::Signed;

        assert!(SessionGate::from_settings(&auth, &pool).is_err());

        auth.session.secret = "signing-secret".to_string();
        let gate = SessionGate::from_settings(&auth, &pool).unwrap();
        let token = gate.issue("user-1").await.unwrap();
        assert_eq!(
            gate.validate(&token).await.unwrap().as_deref(),
            Some("user-1")
        );
    }

    fn headers_with_auth(value: &str) -> HeaderMap {
        let request = Request::builder()
            .uri("/")
            .header(header::AUTHORIZATION, value)
            .body(())
            .unwrap();
        request.into_parts().0.headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers_with_auth("Bearer abc123");
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let headers = headers_with_auth("Basic abc123");
        assert!(bearer_token(&headers).is_none());
    }
}
