use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    sellers::{
        dto::{NewSellerRequest, SellerPublic, SellerWithUser},
        repo,
    },
    state::AppState,
    users,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sellers", get(list_sellers).post(create_seller))
        .route("/sellers/:id", axum::routing::delete(delete_seller))
}

#[instrument(skip(state))]
pub async fn list_sellers(
    State(state): State<AppState>,
) -> Result<Json<Vec<SellerWithUser>>, ApiError> {
    let sellers = repo::list(&state.db).await?;
    let users = users::repo::list(&state.db).await?;
    let listing = sellers
        .iter()
        .filter_map(|seller| {
            users
                .iter()
                .find(|u| u.id == seller.user_id)
                .map(|user| SellerWithUser {
                    seller: SellerPublic::from(seller),
                    user: user.into(),
                })
        })
        .collect();
    Ok(Json(listing))
}

#[instrument(skip(state, payload))]
pub async fn create_seller(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<NewSellerRequest>,
) -> Result<(StatusCode, Json<SellerPublic>), ApiError> {
    let seller = repo::create(
        &state.db,
        user_id,
        &payload.department,
        &payload.city,
        &payload.address,
        payload.floor_or_apartment.as_deref(),
        payload.phone_number.as_deref(),
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        // One seller profile per user.
        ApiError::Conflict(_) => ApiError::Conflict("Seller profile already exists".into()),
        other => other,
    })?;

    info!(seller_id = %seller.id, user_id = %user_id, "seller created");
    Ok((StatusCode::CREATED, Json(SellerPublic::from(&seller))))
}

#[instrument(skip(state))]
pub async fn delete_seller(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::delete_own(&state.db, id, user_id).await? {
        return Err(ApiError::NotFound("Seller not found".into()));
    }
    info!(seller_id = %id, "seller deleted");
    Ok(StatusCode::NO_CONTENT)
}
