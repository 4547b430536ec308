//! Session extraction
//!
//! The credential arrives as `Authorization: Bearer <token>`. Handlers that
//! take a [`Session`] reject requests without one; handlers that take
//! `Option<Session>` treat them as anonymous.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::cache::Principal;
use crate::drive::AccessToken;
use crate::error::AppError;

/// The caller's credential and the principal derived from it.
#[derive(Debug, Clone)]
pub struct Session {
    token: AccessToken,
    principal: Principal,
}

impl Session {
    pub fn new(token: AccessToken) -> Self {
        let principal = Principal::from_credential(token.secret());
        Self { token, principal }
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// Pulls the bearer token out of an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::Unauthorized)?;

        Ok(Session::new(AccessToken::new(token)))
    }
}
