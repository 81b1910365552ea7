//! Authentication
//!
//! - `password`: PBKDF2 password hashes
//! - `jwt`: access/refresh tokens
//! - `reset`: password reset tokens
//! - `extract`: `AuthUser` / `MaybeUser` request extractors
//! - `google`: reCAPTCHA and Google sign-in verification

pub mod extract;
pub mod google;
pub mod jwt;
pub mod password;
pub mod reset;

pub use extract::{AuthUser, MaybeUser};
pub use jwt::{Claims, JwtKeys, TokenPair, TokenType};
pub use reset::ResetTokens;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingToken,

    #[error("Given token not valid for any token type")]
    InvalidToken,

    #[error("Token has wrong type")]
    WrongTokenType,

    #[error("User not found")]
    UserNotFound,

    #[error("User is inactive")]
    UserInactive,

    #[error("Invalid Google token: {0}")]
    Google(String),

    #[error("Authentication backend error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Internal(err.to_string())
    }
}
