//! Session strategies. Exactly one implementation is active per process,
//! chosen from configuration at boot; handlers never branch on the kind.

use async_trait::async_trait;

use crate::error::AuthError;

mod signed;
mod store;

pub use signed::SignedSessions;
pub use store::{StoreSessions, SESSIONS_TABLE};

pub type SessionToken = String;

/// Ephemeral proof of identity: minted at login, presented on every
/// request that touches an owned resource, gone at logout or expiry.
#[async_trait]
pub trait SessionStrategy: Send + Sync {
    /// Mint a token bound to the user id, expiring after the configured
    /// session lifetime.
    async fn issue(&self, user_id: &str) -> Result<SessionToken, AuthError>;

    /// Resolve a token to the bound user id. `None` means absent, expired,
    /// or tampered; the caller treats all three identically.
    async fn validate(&self, token: &str) -> Result<Option<String>, AuthError>;

    /// Invalidate a token. Returns whether server-side state was removed
    /// (always `false` for stateless tokens).
    async fn logout(&self, token: &str) -> Result<bool, AuthError>;
}
