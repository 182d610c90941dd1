//! Bearer-token authentication for protected routes.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::api::AppState;
use crate::domain::value_objects::UserId;
use crate::CatalogError;

/// The caller, as established by a valid `Authorization: Bearer` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = CatalogError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }
        let token = extract_bearer(&parts.headers).ok_or(CatalogError::Unauthorized)?;
        let user = AuthUser(state.services.accounts.verify(token)?);
        parts.extensions.insert(user);
        Ok(user)
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}
