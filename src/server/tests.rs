use std::collections::HashSet;

use axum::{
    body::{to_bytes, Body},
    http::{self, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use tower::util::ServiceExt;

use crate::{
    generator::{Entropy, LANGUAGES, USERS},
    types::{ErrorResponse, HealthReport, UsageReport},
};

use super::{router, AppState, REQUEST_ID_HEADER};

const MAX_BODY_SIZE: usize = 1024 * 1024; // 1MB limit

fn app(entropy: Entropy, debug: bool) -> Router {
    router(AppState { entropy, debug })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(http::Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(
    response: axum::response::Response,
) -> T {
    let body = to_bytes(response.into_body(), MAX_BODY_SIZE).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health() {
    let response = app(Entropy::Os, false)
        .oneshot(get("/api/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body, serde_json::json!({"status": "healthy"}));
    let report: HealthReport = serde_json::from_value(body).unwrap();
    assert_eq!(report, HealthReport::healthy());
}

#[tokio::test]
async fn usage() {
    let before = Utc::now();
    let response = app(Entropy::Os, false)
        .oneshot(get("/api/usage"))
        .await
        .unwrap();
    let after = Utc::now();
    assert_eq!(response.status(), StatusCode::OK);

    let report: UsageReport = body_json(response).await;
    assert_eq!(report.status, "success");
    let timestamp = DateTime::parse_from_rfc3339(&report.timestamp)
        .unwrap()
        .with_timezone(&Utc);
    assert!(before <= timestamp && timestamp <= after);

    let users: Vec<&str> =
        report.data.iter().map(|r| r.user.as_str()).collect();
    assert_eq!(users, USERS);

    let known: HashSet<&str> = LANGUAGES.into_iter().collect();
    for record in &report.data {
        let sum: u32 = record.language_breakdown.values().sum();
        assert_eq!(record.completions, sum);
        assert!((3..=5).contains(&record.language_breakdown.len()));
        assert!(record
            .language_breakdown
            .keys()
            .all(|lang| known.contains(lang.as_str())));
        assert!((5.0..=40.0).contains(&record.active_hours));

        let last_seen = DateTime::parse_from_rfc3339(&record.last_seen)
            .unwrap()
            .with_timezone(&Utc);
        assert!(last_seen <= timestamp);
        assert!(last_seen >= timestamp - Duration::days(7));
    }
}

#[tokio::test]
async fn usage_with_seed_repeats() {
    let app = app(Entropy::Seeded(42), false);
    let a: UsageReport = body_json(
        app.clone().oneshot(get("/api/usage")).await.unwrap(),
    )
    .await;
    let b: UsageReport =
        body_json(app.oneshot(get("/api/usage")).await.unwrap()).await;

    // Same draws, but last_seen is relative to each request's clock.
    let strip = |report: &UsageReport| {
        report
            .data
            .iter()
            .map(|r| {
                (
                    r.user.clone(),
                    r.completions,
                    r.active_hours.to_bits(),
                    r.language_breakdown.clone(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&a), strip(&b));
}

#[tokio::test]
async fn unknown_route() {
    let response = app(Entropy::Os, false)
        .oneshot(get("/api/nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: ErrorResponse = body_json(response).await;
    assert_eq!(body.error, "Not Found");
    assert_eq!(body.details, None);
}

#[tokio::test]
async fn unknown_route_in_debug_mode_has_details() {
    let response = app(Entropy::Os, true)
        .oneshot(get("/api/nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: ErrorResponse = body_json(response).await;
    assert_eq!(body.details.as_deref(), Some("No route for /api/nope"));
}

#[tokio::test]
async fn wrong_method() {
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("/api/usage")
        .body(Body::empty())
        .unwrap();
    let response = app(Entropy::Os, false).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let request = Request::builder()
        .method(http::Method::GET)
        .uri("/api/usage")
        .header(http::header::ORIGIN, "http://somewhere.example")
        .body(Body::empty())
        .unwrap();
    let response = app(Entropy::Os, false).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn cors_preflight() {
    let request = Request::builder()
        .method(http::Method::OPTIONS)
        .uri("/api/health")
        .header(http::header::ORIGIN, "http://localhost:3000")
        .header(http::header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app(Entropy::Os, false).oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn request_id_header() {
    let app = app(Entropy::Os, false);
    let id = |response: &axum::response::Response| {
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    };
    let a = app.clone().oneshot(get("/api/health")).await.unwrap();
    let b = app.oneshot(get("/api/nope")).await.unwrap();
    assert!(!id(&a).is_empty());
    assert!(!id(&b).is_empty());
    assert_ne!(id(&a), id(&b));
}

#[tokio::test]
async fn openapi_document() {
    let response = app(Entropy::Os, false)
        .oneshot(get("/api-docs/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc: serde_json::Value = body_json(response).await;
    let paths = doc.get("paths").unwrap();
    assert!(paths.get("/api/usage").is_some());
    assert!(paths.get("/api/health").is_some());
    let schemas = doc.pointer("/components/schemas").unwrap();
    assert!(schemas.get("UsageRecord").is_some());
}
