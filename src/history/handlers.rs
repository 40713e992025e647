use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser, error::ApiError, history::repo, products::dto::ProductSummary,
    state::AppState,
};

const RECOMMENDATION_LIMIT: i64 = 15;

pub fn router() -> Router<AppState> {
    Router::new().route("/history/recommendations", get(recommendations))
}

#[instrument(skip(state))]
pub async fn recommendations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ProductSummary>>, ApiError> {
    let products =
        repo::recommendations_for_user(&state.db, user_id, RECOMMENDATION_LIMIT).await?;
    Ok(Json(products.iter().map(Into::into).collect()))
}
