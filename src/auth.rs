use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::routes::AppState;

/// An authenticated administrator, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: i64,
    pub name: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Compare without leaking the length of the matching prefix through timing.
fn token_matches(expected: &str, given: &str) -> bool {
    expected.as_bytes().ct_eq(given.as_bytes()).into()
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

        let admin = state
            .admins
            .iter()
            .find(|admin| token_matches(&admin.token, token));
        match admin {
            Some(admin) => Ok(AdminUser {
                id: admin.id,
                name: admin.name.clone(),
            }),
            None => {
                warn!("Rejected unknown bearer token for {}", parts.uri.path());
                Err(ApiError::Unauthorized)
            }
        }
    }
}
