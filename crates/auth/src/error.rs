use thiserror::Error;

use shelf_db::DbError;
use shelf_http::error::AppError;

/// Identity and session failures.
///
/// Credential failures collapse into [`AuthError::InvalidCredentials`]
/// regardless of cause so the caller can never learn whether the account
/// exists, lacks a password, or the password was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account already exists")]
    EmailTaken,

    #[error("email is linked to a different external identity")]
    AccountConflict,

    #[error("session token missing, invalid, or expired")]
    Unauthorized,

    #[error("identity provider exchange failed")]
    Provider(#[source] anyhow::Error),

    #[error("crypto operation failed")]
    Crypto(#[source] anyhow::Error),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::unauthorized("invalid email or password"),
            AuthError::EmailTaken => AppError::conflict(vec![], "user already exists"),
            AuthError::AccountConflict => {
                AppError::conflict(vec![], "email is linked to a different identity")
            }
            AuthError::Unauthorized => AppError::unauthorized("authentication required"),
            AuthError::Provider(source) => {
                tracing::warn!(error = %source, "identity provider exchange failed");
                AppError::unauthorized("provider login failed")
            }
            AuthError::Crypto(source) => AppError::Internal(source),
            AuthError::Store(source) => AppError::Internal(anyhow::Error::new(source)),
        }
    }
}
