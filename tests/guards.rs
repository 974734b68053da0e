#[path = "common/mod.rs"]
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::test_config;
use frontdesk::{app, build_state};
use http_body_util::BodyExt;
use tower::ServiceExt; // for oneshot

const ALLOWED_ORIGIN: &str = "https://aos-ai.com";

#[tokio::test]
async fn preflight_short_circuits_with_204() {
    let state = build_state(test_config());
    let resp = app(state)
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/generate-flows")
                .header("origin", ALLOWED_ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        resp.headers().get("access-control-allow-methods").unwrap(),
        "POST,GET,OPTIONS"
    );
    assert_eq!(
        resp.headers().get("access-control-allow-headers").unwrap(),
        "Content-Type, X-CSRF-Token"
    );
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        ALLOWED_ORIGIN
    );
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn allowed_origin_is_echoed_with_vary() {
    let resp = app(build_state(test_config()))
        .oneshot(
            Request::get("/voices")
                .header("origin", ALLOWED_ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        ALLOWED_ORIGIN
    );
    assert_eq!(resp.headers().get("vary").unwrap(), "Origin");
}

#[tokio::test]
async fn disallowed_origin_gets_no_cors_headers_but_is_served() {
    let resp = app(build_state(test_config()))
        .oneshot(
            Request::get("/voices")
                .header("origin", "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    // The request is still processed: CORS is browser enforcement.
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("access-control-allow-origin").is_none());
    assert!(resp.headers().get("vary").is_none());
    // The method/header lists are always present.
    assert_eq!(
        resp.headers().get("access-control-allow-methods").unwrap(),
        "POST,GET,OPTIONS"
    );
}

fn valid_flows_body() -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "cfg": {
            "version": 1,
            "bizName": "Acme Dental",
            "receptionistName": "Ava",
            "timezone": "America/New_York",
            "calendarId": "primary",
            "email": "a@acme.com"
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn csrf_enforced_when_required() {
    let mut config = test_config();
    config.require_csrf = true;
    let state = build_state(config);

    // No token pair at all.
    let resp = app(state.clone())
        .oneshot(
            Request::post("/generate-flows")
                .header("content-type", "application/json")
                .body(Body::from(valid_flows_body()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["code"], "CSRF");

    // Mismatched pair fails the same way.
    let resp = app(state.clone())
        .oneshot(
            Request::post("/generate-flows")
                .header("content-type", "application/json")
                .header("cookie", "csrf_tok=aaaa")
                .header("x-csrf-token", "bbbb")
                .body(Body::from(valid_flows_body()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Matching pair passes through to the handler.
    let resp = app(state)
        .oneshot(
            Request::post("/generate-flows")
                .header("content-type", "application/json")
                .header("cookie", "csrf_tok=deadbeef")
                .header("x-csrf-token", "deadbeef")
                .body(Body::from(valid_flows_body()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn csrf_not_enforced_by_default() {
    let resp = app(build_state(test_config()))
        .oneshot(
            Request::post("/generate-flows")
                .header("content-type", "application/json")
                .body(Body::from(valid_flows_body()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
