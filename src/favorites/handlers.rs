use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    favorites::repo::{self, Favorite},
    products,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/favorites/:product_id",
        post(add_favorite).delete(remove_favorite),
    )
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Favorite>), ApiError> {
    products::repo::find_by_id(&state.db, product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    let favorite = repo::add(&state.db, user_id, product_id)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict("This product has already been favorited".into())
            }
            other => other,
        })?;

    info!(user_id = %user_id, product_id = %product_id, "favorite added");
    Ok((StatusCode::CREATED, Json(favorite)))
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::remove(&state.db, user_id, product_id).await? {
        return Err(ApiError::NotFound("Favorite not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
