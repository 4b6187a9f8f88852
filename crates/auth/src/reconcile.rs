//! Identity reconciliation: map a login attempt to exactly one durable
//! user record, creating or linking as needed.
//!
//! The existence-check-then-create sequences here are racy by nature; the
//! store's unique indexes are the arbiter. A losing request observes
//! [`DbError::Conflict`] and either retries as a lookup (lost creation
//! race) or reports [`AuthError::AccountConflict`].

use sqlx::SqlitePool;

use shelf_db::DbError;

use crate::error::AuthError;
use crate::password;
use crate::provider::ProviderIdentity;
use crate::users::{self, User};

/// Sign-up payload. Field presence is validated at the HTTP boundary;
/// this layer only enforces uniqueness.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

/// Create a password-based account.
pub async fn sign_up(pool: &SqlitePool, new_user: &NewUser) -> Result<User, AuthError> {
    let hash = password::hash_password(&new_user.password).map_err(AuthError::Crypto)?;

    match users::insert_password_user(pool, new_user.name.as_deref(), &new_user.email, &hash).await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user signed up");
            Ok(user)
        }
        Err(DbError::Conflict) => Err(AuthError::EmailTaken),
        Err(err) => Err(AuthError::Store(err)),
    }
}

/// Resolve email/password credentials to a user.
///
/// All failure causes (unknown email, provider-only account, wrong
/// password) collapse into `InvalidCredentials`.
pub async fn authenticate(
    pool: &SqlitePool,
    email: &str,
    password_input: &str,
) -> Result<User, AuthError> {
    let user = users::find_by_email(pool, email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let Some(hash) = user.password_hash.as_deref() else {
        return Err(AuthError::InvalidCredentials);
    };

    if !password::verify_password(hash, password_input) {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}

/// Resolve a verified external identity to a user, creating or linking
/// by email equality.
pub async fn reconcile_provider(
    pool: &SqlitePool,
    identity: &ProviderIdentity,
) -> Result<User, AuthError> {
    match users::find_by_email(pool, &identity.email).await? {
        None => match users::insert_provider_user(
            pool,
            identity.display_name.as_deref(),
            &identity.email,
            &identity.provider,
            &identity.account_id,
        )
        .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.id, provider = %identity.provider, "provider user created");
                Ok(user)
            }
            // Lost a creation race on the email, or the provider account is
            // already linked to a row with another email. Re-read by email
            // and fall through to the linking rules; no row means the
            // conflict was on the provider account id.
            Err(DbError::Conflict) => {
                let user = users::find_by_email(pool, &identity.email)
                    .await?
                    .ok_or(AuthError::AccountConflict)?;
                link_or_match(pool, user, identity).await
            }
            Err(err) => Err(AuthError::Store(err)),
        },
        Some(user) => link_or_match(pool, user, identity).await,
    }
}

/// Apply the linking rules for an existing user with this email:
/// attach when no provider is bound, accept a matching binding, reject a
/// divergent one.
async fn link_or_match(
    pool: &SqlitePool,
    user: User,
    identity: &ProviderIdentity,
) -> Result<User, AuthError> {
    if user.provider_account_id.is_none() {
        return match users::attach_provider(pool, &user.id, &identity.provider, &identity.account_id)
            .await
        {
            Ok(true) => {
                tracing::info!(user_id = %user.id, provider = %identity.provider, "provider identity linked");
                users::find_by_id(pool, &user.id)
                    .await?
                    .ok_or(AuthError::Store(DbError::NotFound))
            }
            // Zero rows: a concurrent request attached first. Re-read and
            // accept only an identical binding.
            Ok(false) => {
                let current = users::find_by_id(pool, &user.id)
                    .await?
                    .ok_or(AuthError::Store(DbError::NotFound))?;
                if matches_identity(&current, identity) {
                    Ok(current)
                } else {
                    Err(AuthError::AccountConflict)
                }
            }
            // The provider account id is already bound to some other row.
            Err(DbError::Conflict) => Err(AuthError::AccountConflict),
            Err(err) => Err(AuthError::Store(err)),
        };
    }

    if matches_identity(&user, identity) {
        Ok(user)
    } else {
        Err(AuthError::AccountConflict)
    }
}

fn matches_identity(user: &User, identity: &ProviderIdentity) -> bool {
    user.provider_account_id.as_deref() == Some(identity.account_id.as_str())
        && user.provider.as_deref() == Some(identity.provider.as_str())
}
