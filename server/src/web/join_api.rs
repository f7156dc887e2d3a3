use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::stream::models::User;

use super::app_state::AppState;

/// `POST /join`: provision the user, mint a token and add them to the general channel.
///
/// Every failure answers 500 with the underlying error message as plain text.
pub async fn join(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let user: User = match serde_json::from_slice(&body) {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "invalid join request body");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let user_id = user.id.clone();
    match state.join.join(user).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            error!(%user_id, error = %e, "join failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Any method other than POST on `/join`.
pub async fn wrong_method() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Wrong Method.")
}
