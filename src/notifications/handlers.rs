use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    notifications::{
        dto::{NewNotificationRequest, NotificationPublic},
        repo,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/notifications/:id", delete(delete_notification))
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<NotificationPublic>>, ApiError> {
    let notifications = repo::list_for_user(&state.db, user_id).await?;
    Ok(Json(notifications.iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_notification(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<NewNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationPublic>), ApiError> {
    if payload.kind.trim().is_empty() || payload.text.trim().is_empty() {
        return Err(ApiError::Validation(
            "Notification type and text are required".into(),
        ));
    }
    let notification =
        repo::create(&state.db, user_id, &payload.kind, &payload.text).await?;
    Ok((
        StatusCode::CREATED,
        Json(NotificationPublic::from(&notification)),
    ))
}

#[instrument(skip(state))]
pub async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::delete_own(&state.db, id, user_id).await? {
        return Err(ApiError::NotFound("Notification not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
