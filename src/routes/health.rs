use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.sessions().len().await;
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "sessions": {
            "active": active,
            "max": state.config().sessions.max_sessions,
        }
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// 会话表尚有空位时视为就绪
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.sessions().len().await;
    let max = state.config().sessions.max_sessions;
    let ready = active < max;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "sessions": active,
        })),
    )
}
