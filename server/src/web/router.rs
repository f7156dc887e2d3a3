use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::post;
use tower_http::cors::{Any, CorsLayer};

use super::app_state::AppState;
use super::join_api;

/// Build the axum router for the join API.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Restrict CORS to the configured public_url origin (or allow any for localhost dev)
    let cors = match state.public_url.as_deref() {
        Some(url) if !url.contains("localhost") && !url.contains("127.0.0.1") => {
            let origin = url
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("https://localhost"));
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    Router::new()
        .route(
            "/join",
            post(join_api::join).fallback(join_api::wrong_method),
        )
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(cors)
        .with_state(state)
}
