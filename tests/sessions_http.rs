mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::{spawn_test_app, spawn_with, TestLimits};
use common::fixtures::{Face, RESTING};
use common::http::{
    assert_json_error, assert_status_ok_json, create_session, post_frame, request, request_raw,
    response_json,
};

#[tokio::test]
async fn it_create_without_body_uses_server_defaults() {
    let app = spawn_test_app().await;

    let resp = request(&app.app, Method::POST, "/api/sessions", None).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert!(data["id"].is_string());
    assert_eq!(data["calibrating"], false);
    assert_eq!(data["calibrated"], false);
    assert_eq!(data["historyLen"], 0);
    assert_eq!(data["calibration"]["state"], "idle");
    assert_eq!(data["config"]["calibrationDurationMs"], 3000.0);
    assert_eq!(data["config"]["historyCapacity"], 8);
}

#[tokio::test]
async fn it_create_applies_overrides() {
    let app = spawn_test_app().await;
    let id = create_session(&app.app, Some(json!({ "historyCapacity": 3 }))).await;

    let resp = request(&app.app, Method::GET, &format!("/api/sessions/{id}"), None).await;
    let (status, _, body) = response_json(resp).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["config"]["historyCapacity"], 3);
    assert_eq!(body["data"]["config"]["historyMinGapMs"], 2500.0);
}

#[tokio::test]
async fn it_invalid_config_is_rejected() {
    let app = spawn_test_app().await;
    let resp = request(
        &app.app,
        Method::POST,
        "/api/sessions",
        Some(json!({ "smoothingAlpha": 0.0 })),
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_CONFIG");
}

#[tokio::test]
async fn it_session_limit_returns_429() {
    let app = spawn_with(TestLimits {
        max_sessions: 1,
        ..TestLimits::default()
    })
    .await;
    create_session(&app.app, None).await;

    let resp = request(&app.app, Method::POST, "/api/sessions", None).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_json_error(&body, "SESSION_LIMIT");
}

#[tokio::test]
async fn it_unknown_session_is_404() {
    let app = spawn_test_app().await;
    let missing = uuid::Uuid::new_v4();

    for path in [
        format!("/api/sessions/{missing}"),
        format!("/api/sessions/{missing}/history"),
        "/api/sessions/not-a-uuid".to_string(),
    ] {
        let resp = request(&app.app, Method::GET, &path, None).await;
        let (status, _, body) = response_json(resp).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_json_error(&body, "SESSION_NOT_FOUND");
    }

    let resp = request(
        &app.app,
        Method::POST,
        &format!("/api/sessions/{missing}/frames"),
        Some(json!({ "keypoints": [] })),
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn it_delete_removes_session() {
    let app = spawn_test_app().await;
    let id = create_session(&app.app, None).await;

    let resp = request(&app.app, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = request(&app.app, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "SESSION_NOT_FOUND");
    assert!(app.state.sessions().is_empty().await);
}

#[tokio::test]
async fn it_malformed_frame_body_is_400() {
    let app = spawn_test_app().await;
    let id = create_session(&app.app, None).await;
    let path = format!("/api/sessions/{id}/frames");

    let resp = request_raw(&app.app, Method::POST, &path, "application/json", "{not json").await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_REQUEST_BODY");

    let resp = request(
        &app.app,
        Method::POST,
        &path,
        Some(json!({ "keypoints": [], "timestampMs": -5.0 })),
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_REQUEST_BODY");
}

#[tokio::test]
async fn it_empty_frame_reports_no_face() {
    let app = spawn_test_app().await;
    let id = create_session(&app.app, None).await;

    let report = post_frame(&app.app, &id, json!([]), 0.0).await;
    assert_eq!(report["kind"], "noFace");
    assert!(report["held"].is_null());
    assert_eq!(report["calibrationCompleted"], false);
}

#[tokio::test]
async fn it_short_mesh_is_rejected_and_holds_last_decision() {
    let app = spawn_test_app().await;
    let id = create_session(&app.app, None).await;

    let first = post_frame(&app.app, &id, RESTING.keypoints(), 0.0).await;
    assert_eq!(first["kind"], "classified");
    assert_eq!(first["decision"]["label"], "Neutral");

    let short = json!([{ "x": 1.0, "y": 2.0 }, { "x": 3.0, "y": 4.0 }]);
    let report = post_frame(&app.app, &id, short, 10.0).await;
    assert_eq!(report["kind"], "rejected");
    assert_eq!(report["held"]["label"], "Neutral");
    assert!(report["reason"].as_str().unwrap_or_default().contains("478"));
}

#[tokio::test]
async fn it_uncalibrated_session_stays_neutral() {
    let app = spawn_test_app().await;
    let id = create_session(&app.app, None).await;

    let report = post_frame(&app.app, &id, Face::smiling().keypoints(), 0.0).await;
    assert_eq!(report["decision"]["label"], "Neutral");
    assert_eq!(report["decision"]["confidence"], 0.5);
    assert_eq!(report["metrics"]["smile"], 0.0);
    assert!(report["logged"].is_null());
}

#[tokio::test]
async fn it_extra_keypoint_fields_are_ignored() {
    let app = spawn_test_app().await;
    let id = create_session(&app.app, None).await;

    let mut keypoints = RESTING.keypoints();
    if let Some(points) = keypoints.as_array_mut() {
        for p in points.iter_mut() {
            p["z"] = json!(0.25);
        }
    }
    let report = post_frame(&app.app, &id, keypoints, 0.0).await;
    assert_eq!(report["kind"], "classified");
}
