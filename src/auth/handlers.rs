use axum::{
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::RefreshClaims,
        cookies::{clear_refresh_cookie, extract_refresh_cookie, refresh_cookie},
        dto::{AccessTokenResponse, LoginRequest},
        jwt::JwtKeys,
        password::{is_valid_email, verify_password},
        repo,
        extractors::AuthUser,
    },
    error::ApiError,
    state::AppState,
    users,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AccessTokenResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }

    let user = users::repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("User with email {} not found", payload.email))
        })?;

    if !user.is_verified {
        warn!(user_id = %user.id, "login attempt on unverified account");
        return Err(ApiError::Unauthorized(
            "You must have your account verified for log in".into(),
        ));
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Incorrect password".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let refresh_token = keys.issue_refresh(user.id, &user.email)?;
    repo::store_refresh_token(&state.db, user.id, &refresh_token).await?;
    let access_token = keys.issue_access(user.id)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        refresh_cookie(&refresh_token, keys.refresh_ttl)
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("cookie header: {e}")))?,
    );

    info!(user_id = %user.id, "user logged in");
    Ok((headers, Json(AccessTokenResponse { access_token })))
}

#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<AccessTokenResponse>), ApiError> {
    let presented = extract_refresh_cookie(&headers)
        .ok_or_else(|| ApiError::Validation("Refresh token cookie missing".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let claims: RefreshClaims = keys.verify(&presented)?;

    let user = repo::find_session(&state.db, claims.user_id, &claims.email, &presented)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found, invalid Token".into()))?;

    let new_refresh = keys.issue_refresh(user.id, &user.email)?;
    let rotated =
        repo::rotate_refresh_token(&state.db, user.id, &presented, &new_refresh).await?;
    if !rotated {
        // Lost the race against a concurrent refresh or logout.
        return Err(ApiError::NotFound("User not found, invalid Token".into()));
    }
    let access_token = keys.issue_access(user.id)?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        axum::http::header::SET_COOKIE,
        refresh_cookie(&new_refresh, keys.refresh_ttl)
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("cookie header: {e}")))?,
    );

    info!(user_id = %user.id, "refresh token rotated");
    Ok((response_headers, Json(AccessTokenResponse { access_token })))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    let cleared = repo::clear_refresh_token(&state.db, user_id).await?;
    if !cleared {
        return Err(ApiError::NotFound("User not found, invalid token".into()));
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        clear_refresh_cookie()
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("cookie header: {e}")))?,
    );

    info!(user_id = %user_id, "user logged out");
    Ok((StatusCode::NO_CONTENT, headers))
}
