//! Signed stateless sessions: a self-contained HS256 token carrying the
//! user id and expiry. No server-side state exists, so logout is a
//! client-side discard.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{SessionStrategy, SessionToken};
use crate::error::AuthError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct SignedSessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl SignedSessions {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        // Expiry is the configured lifetime exactly; no clock leeway.
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs,
        }
    }
}

#[async_trait]
impl SessionStrategy for SignedSessions {
    async fn issue(&self, user_id: &str) -> Result<SessionToken, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(anyhow::Error::new(e)))
    }

    async fn validate(&self, token: &str) -> Result<Option<String>, AuthError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(Some(data.claims.sub)),
            // Expired, tampered, or garbage: all read as "no session".
            Err(_) => Ok(None),
        }
    }

    async fn logout(&self, _token: &str) -> Result<bool, AuthError> {
        Ok(false)
    }
}
