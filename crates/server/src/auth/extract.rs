//! Bearer token extractors

use super::{AuthError, TokenType};
use crate::api::error::ApiError;
use crate::db::queries;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;
use studyhub_core::User;
use tracing::debug;

/// Authenticated user. Rejects with 401 when the token is missing or invalid.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Authenticated user when a token was sent, `None` for anonymous requests.
/// A token that is present but invalid is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

async fn authenticate(state: &AppState, token: &str) -> Result<User, AuthError> {
    let claims = state.jwt.decode(token, TokenType::Access)?;
    let user = queries::users::get_user_by_id(&state.db, claims.user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    if !user.is_active {
        return Err(AuthError::UserInactive);
    }
    debug!(user_id = user.id, "Authenticated request");
    Ok(user)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        Ok(AuthUser(authenticate(state, token).await?))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(MaybeUser(Some(authenticate(state, token).await?))),
            None => Ok(MaybeUser(None)),
        }
    }
}

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}
