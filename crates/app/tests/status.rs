//! Integration tests for the `/_status` routes and the fallback

mod common;

use http::header::ACCEPT;
use http::{Request, StatusCode};

use axum::body::Body;
use common::*;

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _) = setup();

    let response = get(&app, "/_status/livez", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "ok");

    let response = get(&app, "/_status/readyz", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = get(&app, "/_status/version", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "bucketgate");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = setup();

    let request = Request::get("/no/such/page")
        .header(ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["msg"], "not found");
}
