use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error taxonomy for the whole API. Every failure in a handler resolves to
/// one of these and then to an HTTP response; nothing here is fatal to the
/// process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    /// Token past its TTL. Recoverable by refreshing or logging in again,
    /// so it gets its own variant instead of folding into Unauthorized.
    #[error("{0}")]
    Expired(String),
    #[error("{0}")]
    Malformed(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Expired(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Malformed(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => ApiError::NotFound("Not found".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let field = db
                    .constraint()
                    .map(constraint_field)
                    .unwrap_or("value");
                ApiError::Conflict(format!("{field} already taken"))
            }
            _ => ApiError::Internal(e.into()),
        }
    }
}

/// Best-effort translation of a unique constraint name into the offending
/// field, so the client gets "email already taken" rather than a storage
/// error.
fn constraint_field(constraint: &str) -> &str {
    if constraint.contains("email") {
        "email"
    } else if constraint.contains("username") {
        "username"
    } else if constraint.contains("user_id") {
        "user"
    } else {
        "value"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        let cases = [
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Expired("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Malformed("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn internal_hides_details() {
        let err = ApiError::Internal(anyhow::anyhow!("secret detail"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn constraint_names_map_to_fields() {
        assert_eq!(constraint_field("users_email_key"), "email");
        assert_eq!(constraint_field("users_username_key"), "username");
        assert_eq!(constraint_field("sellers_user_id_key"), "user");
        assert_eq!(constraint_field("whatever"), "value");
    }
}
