use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    reviews::{
        dto::{ListReviewsQuery, NewReviewRequest, ReviewPublic, UpdateReviewRequest},
        repo,
    },
    sellers,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(list_reviews).post(create_review))
        .route(
            "/reviews/:id",
            get(get_review).patch(update_review).delete(delete_review),
        )
}

fn check_rating(rating: Decimal) -> Result<(), ApiError> {
    if rating < Decimal::from(1) || rating > Decimal::from(5) {
        return Err(ApiError::Validation(
            "Rating must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ListReviewsQuery>,
) -> Result<Json<Vec<ReviewPublic>>, ApiError> {
    let reviews = repo::list(&state.db, query.seller_id).await?;
    Ok(Json(reviews.iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewPublic>, ApiError> {
    let review = repo::find_with_author(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
    Ok(Json(ReviewPublic::from(&review)))
}

#[instrument(skip(state, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<NewReviewRequest>,
) -> Result<(StatusCode, Json<ReviewPublic>), ApiError> {
    check_rating(payload.rating)?;
    sellers::repo::find_by_id(&state.db, payload.seller_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Seller not found".into()))?;

    let review = repo::create(
        &state.db,
        user_id,
        payload.seller_id,
        payload.rating,
        payload.comment.as_deref(),
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        // One review per user and seller.
        ApiError::Conflict(_) => ApiError::Conflict("You already reviewed this seller".into()),
        other => other,
    })?;

    info!(review_id = %review.id, seller_id = %payload.seller_id, "review created");
    let created = repo::find_with_author(&state.db, review.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("review {} vanished after insert", review.id))?;
    Ok((StatusCode::CREATED, Json(ReviewPublic::from(&created))))
}

#[instrument(skip(state, payload))]
pub async fn update_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewPublic>, ApiError> {
    if let Some(rating) = payload.rating {
        check_rating(rating)?;
    }
    let review = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
    if review.user_id != user_id {
        return Err(ApiError::Unauthorized(
            "Cannot update another user's review".into(),
        ));
    }

    repo::update(&state.db, id, payload.rating, payload.comment.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
    let updated = repo::find_with_author(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
    Ok(Json(ReviewPublic::from(&updated)))
}

#[instrument(skip(state))]
pub async fn delete_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let review = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
    if review.user_id != user_id {
        return Err(ApiError::Unauthorized(
            "Cannot delete another user's review".into(),
        ));
    }

    repo::delete(&state.db, id).await?;
    info!(review_id = %id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}
