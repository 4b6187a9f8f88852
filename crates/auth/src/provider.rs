//! External identity provider boundary. The network handshake is a black
//! box behind [`IdentityProvider`]; reconciliation only ever sees the
//! verified `(account id, email, display name)` tuple.

use anyhow::anyhow;
use async_trait::async_trait;
use serde::Deserialize;

use shelf_kernel::settings::ProviderSettings;

use crate::error::AuthError;

pub use reqwest::Url;

/// Verified identity as reported by the provider.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub provider: String,
    pub account_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the user agent to start the login.
    fn authorize_url(&self) -> Result<reqwest::Url, AuthError>;

    /// Exchange an authorization code for a verified identity.
    async fn exchange(&self, code: &str) -> Result<ProviderIdentity, AuthError>;
}

/// OIDC-style provider adapter: authorization-code exchange followed by a
/// userinfo lookup.
pub struct OidcProvider {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl OidcProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

fn provider_err(err: reqwest::Error) -> AuthError {
    AuthError::Provider(anyhow::Error::new(err))
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn authorize_url(&self) -> Result<reqwest::Url, AuthError> {
        reqwest::Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", self.settings.scope.as_str()),
            ],
        )
        .map_err(|e| AuthError::Provider(anyhow::Error::new(e)))
    }

    async fn exchange(&self, code: &str) -> Result<ProviderIdentity, AuthError> {
        let token: TokenResponse = self
            .http
            .post(&self.settings.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(provider_err)?
            .error_for_status()
            .map_err(provider_err)?
            .json()
            .await
            .map_err(provider_err)?;

        let info: UserInfo = self
            .http
            .get(&self.settings.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(provider_err)?
            .error_for_status()
            .map_err(provider_err)?
            .json()
            .await
            .map_err(provider_err)?;

        let email = info
            .email
            .ok_or_else(|| AuthError::Provider(anyhow!("userinfo response carried no email")))?;

        Ok(ProviderIdentity {
            provider: self.settings.name.clone(),
            account_id: info.sub,
            email,
            display_name: info.name,
        })
    }
}
