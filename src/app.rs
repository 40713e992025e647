use axum::{http::Request, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info_span;

use crate::{
    auth, cart, favorites, history, notifications, products, reviews, sellers, state::AppState,
    users,
};

pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(sellers::router())
        .merge(products::router())
        .merge(reviews::router())
        .merge(favorites::router())
        .merge(cart::router())
        .merge(history::router())
        .merge(notifications::router());

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_answers_without_auth() {
        let app = build_app(AppState::fake());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_rejects_missing_token() {
        let app = build_app(AppState::fake());
        let response = app
            .oneshot(
                Request::get("/api/users/me/favorites")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_rejected() {
        let app = build_app(AppState::fake());
        let response = app
            .oneshot(
                Request::post("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
