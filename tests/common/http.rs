use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::util::ServiceExt;

pub async fn request(app: &Router, method: Method, path: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(path);

    let req = if let Some(payload) = body {
        builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("empty body")
    };

    app.clone().oneshot(req).await.expect("oneshot response")
}

/// 模拟来自指定对端地址的连接，可附带额外请求头。
pub async fn request_from(
    app: &Router,
    method: Method,
    path: &str,
    peer: &str,
    headers: &[(&str, &str)],
) -> Response {
    let addr: SocketAddr = peer.parse().expect("peer socket addr");
    let mut builder = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut req = builder.body(Body::empty()).expect("empty body");
    req.extensions_mut().insert(ConnectInfo(addr));
    app.clone().oneshot(req).await.expect("oneshot response")
}

pub async fn request_raw(
    app: &Router,
    method: Method,
    path: &str,
    content_type: &str,
    body: &'static str,
) -> Response {
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", content_type)
        .body(Body::from(body))
        .expect("raw body");
    app.clone().oneshot(req).await.expect("oneshot response")
}

pub async fn response_json(resp: Response) -> (StatusCode, HeaderMap, Value) {
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body bytes");

    let json = if bytes.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_slice::<Value>(&bytes).expect("parse json body")
    };

    (status, headers, json)
}

pub fn assert_json_error(body: &Value, code: &str) {
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], code);
    assert!(body.get("message").is_some());
    assert!(body["traceId"].is_string());
}

pub fn assert_status_ok_json(status: StatusCode, body: &Value) {
    assert!(status.is_success());
    assert_eq!(body["success"], true);
    assert!(body.get("data").is_some());
}

/// Creates a session and returns its id.
pub async fn create_session(app: &Router, overrides: Option<Value>) -> String {
    let (status, _, body) =
        response_json(request(app, Method::POST, "/api/sessions", overrides).await).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["data"]["id"]
        .as_str()
        .expect("session id")
        .to_string()
}

pub async fn post_frame(app: &Router, id: &str, keypoints: Value, timestamp_ms: f64) -> Value {
    let (status, _, body) = response_json(
        request(
            app,
            Method::POST,
            &format!("/api/sessions/{id}/frames"),
            Some(serde_json::json!({ "keypoints": keypoints, "timestampMs": timestamp_ms })),
        )
        .await,
    )
    .await;
    assert_status_ok_json(status, &body);
    body["data"].clone()
}
