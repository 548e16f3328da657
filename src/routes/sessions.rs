use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use micro_emotion_wasm::{Keypoint, SessionConfig};
use serde::Deserialize;
use uuid::Uuid;

use crate::extractors::{JsonBody, OptionalJsonBody};
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::validation::{validate_frame, validate_timestamp};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/:id", get(get_session).delete(delete_session))
        .route("/:id/frames", post(submit_frame))
        .route(
            "/:id/calibration",
            post(begin_calibration).delete(cancel_calibration),
        )
        .route("/:id/history", get(history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    pub keypoints: Vec<Keypoint>,
    pub timestamp_ms: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRequest {
    pub timestamp_ms: Option<f64>,
}

/// 格式错误的 id 不可能对应存活会话，按会话不存在处理
pub(crate) fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| {
        AppError::new(
            StatusCode::NOT_FOUND,
            "SESSION_NOT_FOUND",
            &format!("session {raw} not found"),
        )
    })
}

/// 把客户端参数覆盖到服务器默认值上，客户端未给出的字段保留服务器配置而非库默认值
fn merge_config(
    defaults: &SessionConfig,
    overrides: Option<serde_json::Value>,
) -> Result<SessionConfig, AppError> {
    let Some(overrides) = overrides else {
        return Ok(defaults.clone());
    };
    let serde_json::Value::Object(patch) = overrides else {
        return Err(AppError::bad_request(
            "INVALID_REQUEST_BODY",
            "请求体必须是 JSON 对象",
        ));
    };

    let mut base =
        serde_json::to_value(defaults).map_err(|e| AppError::internal(&e.to_string()))?;
    if let Some(obj) = base.as_object_mut() {
        obj.extend(patch);
    }
    serde_json::from_value(base).map_err(|e| AppError::bad_request("INVALID_CONFIG", &e.to_string()))
}

async fn create_session(
    State(state): State<AppState>,
    OptionalJsonBody(overrides): OptionalJsonBody<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let config = merge_config(&state.config().emotion, overrides)?;
    let status = state.sessions().create(config).await?;
    Ok(created(status))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_session_id(&id)?;
    Ok(ok(state.sessions().status(id).await?))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_session_id(&id)?;
    state.sessions().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_frame(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<FrameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_session_id(&id)?;
    validate_frame(&req.keypoints, req.timestamp_ms)
        .map_err(|msg| AppError::bad_request("INVALID_REQUEST_BODY", msg))?;

    let report = state
        .sessions()
        .process_frame(id, &req.keypoints, req.timestamp_ms)
        .await?;
    Ok(ok(report))
}

async fn begin_calibration(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalJsonBody(req): OptionalJsonBody<CalibrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_session_id(&id)?;
    let req = req.unwrap_or_default();
    if let Some(ts) = req.timestamp_ms {
        validate_timestamp(ts).map_err(|msg| AppError::bad_request("INVALID_REQUEST_BODY", msg))?;
    }

    let status = state
        .sessions()
        .begin_calibration(id, req.timestamp_ms)
        .await?;
    Ok(ok(status))
}

async fn cancel_calibration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_session_id(&id)?;
    let cancelled = state.sessions().cancel_calibration(id).await?;
    Ok(ok(serde_json::json!({ "cancelled": cancelled })))
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_session_id(&id)?;
    Ok(ok(state.sessions().history(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_keep_server_defaults() {
        let defaults = SessionConfig {
            history_capacity: 4,
            ..SessionConfig::default()
        };
        let merged = merge_config(
            &defaults,
            Some(serde_json::json!({ "calibrationDurationMs": 1000.0 })),
        )
        .expect("merge");
        assert_eq!(merged.calibration_duration_ms, 1000.0);
        assert_eq!(merged.history_capacity, 4);
    }

    #[test]
    fn missing_body_uses_defaults() {
        let defaults = SessionConfig::default();
        assert_eq!(merge_config(&defaults, None).expect("merge"), defaults);
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = merge_config(&SessionConfig::default(), Some(serde_json::json!([1, 2])))
            .expect_err("array body");
        assert_eq!(err.code, "INVALID_REQUEST_BODY");
    }

    #[test]
    fn wrong_field_type_is_invalid_config() {
        let err = merge_config(
            &SessionConfig::default(),
            Some(serde_json::json!({ "historyCapacity": "many" })),
        )
        .expect_err("bad type");
        assert_eq!(err.code, "INVALID_CONFIG");
    }

    #[test]
    fn malformed_id_reads_as_unknown_session() {
        let err = parse_session_id("not-a-uuid").expect_err("invalid");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "SESSION_NOT_FOUND");
    }
}
