//! Authentication error types.

use ims_core::error::ImsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is temporarily locked")]
    AccountLocked { retry_after_secs: u64 },

    #[error("account is inactive")]
    AccountInactive,

    #[error("user has no site access")]
    NoSiteAccess,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for ImsError {
    fn from(err: AuthError) -> Self {
        match err {
            // All credential failures collapse to the same
            // client-facing error — the distinction stays in the
            // security log only.
            AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => ImsError::AuthenticationRequired,
            AuthError::AccountLocked { retry_after_secs } => {
                ImsError::RateLimited { retry_after_secs }
            }
            AuthError::NoSiteAccess => ImsError::AuthorizationDenied {
                reason: "user has no site access".into(),
            },
            AuthError::Crypto(msg) => ImsError::Crypto(msg),
        }
    }
}
