use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use availability_cell::handlers::AvailabilityState;
use availability_cell::router::availability_routes;
use shared_store::MemoryStore;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn test_app() -> (Router, String) {
    let test_config = TestConfig::default();
    let token = JwtTestUtils::create_test_token(
        &TestUser::doctor("doctor@example.com"),
        &test_config.jwt_secret,
        Some(24),
    );

    let state = AvailabilityState {
        config: test_config.to_arc(),
        store: Arc::new(MemoryStore::new()),
    };
    (availability_routes(state), token)
}

fn put_availability(token: &str, doctor_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/{}", doctor_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_set_availability_requires_auth() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/doc-1")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"dates": ["2026-03-16"], "work_start": "9:00 AM", "work_end": "5:00 PM"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_set_then_get_availability() {
    let (app, token) = test_app();

    let response = app
        .clone()
        .oneshot(put_availability(
            &token,
            "doc-1",
            json!({"dates": ["2026-03-16"], "work_start": "9:00 AM", "work_end": "12:00 PM"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["results"][0]["success"], true);

    // Reads are public: no Authorization header.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/doc-1/2026-03-16")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["doctor_id"], "doc-1");
    assert_eq!(body["work_start"], "9:00 AM");
    assert_eq!(body["available_slots"].as_array().unwrap().len(), 12);
    assert_eq!(body["available_slots"][0], "9:00 AM");
}

#[tokio::test]
async fn test_get_absent_date_answers_empty() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/doc-1/2026-03-16")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["available_slots"], json!([]));
    assert_eq!(body["work_start"], Value::Null);
}

#[tokio::test]
async fn test_set_availability_rejects_inverted_window() {
    let (app, token) = test_app();

    let response = app
        .oneshot(put_availability(
            &token,
            "doc-1",
            json!({"dates": ["2026-03-16"], "work_start": "5:00 PM", "work_end": "9:00 AM"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_availability_rejects_empty_dates() {
    let (app, token) = test_app();

    let response = app
        .oneshot(put_availability(
            &token,
            "doc-1",
            json!({"dates": [], "work_start": "9:00 AM", "work_end": "5:00 PM"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_availability_range() {
    let (app, token) = test_app();

    let response = app
        .clone()
        .oneshot(put_availability(
            &token,
            "doc-1",
            json!({
                "dates": ["2026-03-16", "2026-03-18"],
                "work_start": "9:00 AM",
                "work_end": "12:00 PM"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/doc-1?from=2026-03-16&to=2026-03-19")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["days"][0]["date"], "2026-03-16");
    assert_eq!(body["days"][1]["date"], "2026-03-18");
}
