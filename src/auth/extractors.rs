use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::auth::claims::AccessClaims;
use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;

/// Mandatory authentication: rejects when the Authorization header is
/// missing, malformed or expired. Never fabricates an identity.
pub struct AuthUser(pub Uuid);

/// Optional authentication: a missing header continues as anonymous, but a
/// present-and-invalid token is still an error.
pub struct MaybeUser(pub Option<Uuid>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn decode_user<S>(parts: &Parts, state: &S) -> Result<Uuid, ApiError>
where
    JwtKeys: FromRef<S>,
{
    let token = bearer_token(parts)
        .ok_or_else(|| ApiError::Unauthorized("Token missing or invalid".into()))?;
    let keys = JwtKeys::from_ref(state);
    let claims: AccessClaims = keys.verify(token)?;
    Ok(claims.user_id)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        decode_user(parts, state).map(AuthUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(MaybeUser(None));
        }
        decode_user(parts, state).map(|id| MaybeUser(Some(id)))
    }
}
