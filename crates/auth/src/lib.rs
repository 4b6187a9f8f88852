//! Identity reconciliation and the session/authorization gate.
//!
//! This crate resolves a login attempt (credentials or a verified external
//! identity) to exactly one durable user record, and turns that identity
//! into a session token that later requests present to the [`CurrentUser`]
//! extractor. The session implementation is pluggable via
//! [`SessionStrategy`] and selected once at configuration time.

pub mod error;
pub mod extract;
pub mod password;
pub mod provider;
pub mod reconcile;
pub mod session;
pub mod users;

pub use error::AuthError;
pub use extract::{CurrentUser, SessionGate};
pub use provider::{IdentityProvider, OidcProvider, ProviderIdentity};
pub use session::{SessionStrategy, SessionToken};
pub use users::User;
