//! Store failures surfacing through the `/api/v1` routes

mod common;

use http::header::CONTENT_LENGTH;
use http::StatusCode;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use common::*;
use store::testing::Faults;

const OBJECT_SIZE: usize = 1024 * 1024;

#[tokio::test]
async fn test_progressive_download_cut_short_by_read_failure() {
    let (app, store) = setup_faulty(
        "teamA",
        Faults {
            read_after_chunks: Some(4),
            ..Default::default()
        },
    );
    store.seed("media/clip.bin", vec![1u8; OBJECT_SIZE]).await.unwrap();
    let auth = bearer(json!({"groups": ["teamA"]}));

    let response = get_streamed(&app, "/api/v1/download-p/media/clip.bin?bucket=teamA", &auth).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[CONTENT_LENGTH], OBJECT_SIZE.to_string());
    assert!(response.failed);
    assert_eq!(response.received.len(), 4 * 64 * 1024);
    assert!(response.received.len() < OBJECT_SIZE);
    assert_eq!(store.open_bodies(), 0);
}

#[tokio::test]
async fn test_buffered_download_read_failure() {
    let (app, store) = setup_faulty(
        "teamA",
        Faults {
            read_after_chunks: Some(1),
            ..Default::default()
        },
    );
    store.seed("x.bin", vec![2u8; OBJECT_SIZE]).await.unwrap();
    let auth = bearer(json!({"groups": ["teamA"]}));

    let response = get(&app, "/api/v1/download/x.bin?bucket=teamA", Some(&auth)).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json()["msg"]
        .as_str()
        .unwrap()
        .starts_with("failed to read object"));
    assert_eq!(store.open_bodies(), 0);
}

#[tokio::test]
async fn test_abandoned_download_releases_the_object() {
    let (app, store) = setup_faulty("teamA", Faults::default());
    store.seed("x.bin", vec![3u8; OBJECT_SIZE]).await.unwrap();
    let auth = bearer(json!({"groups": ["teamA"]}));

    let request = http::Request::get("/api/v1/download-p/x.bin?bucket=teamA")
        .header(http::header::AUTHORIZATION, &auth)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.open_bodies(), 1);

    let mut body = response.into_body();
    let first = body.frame().await.unwrap().unwrap();
    assert!(first.is_data());
    drop(body);
    assert_eq!(store.open_bodies(), 0);
}

#[tokio::test]
async fn test_listing_failure_returns_no_objects() {
    let (app, store) = setup_faulty(
        "teamA",
        Faults {
            list_after_entries: Some(1),
            ..Default::default()
        },
    );
    store.seed("a.txt", "a").await.unwrap();
    store.seed("b.txt", "b").await.unwrap();
    let auth = bearer(json!({"groups": ["teamA"]}));

    for uri in [
        "/api/v1/list?bucket=teamA&recursive=true",
        "/api/v1/list?bucket=teamA",
    ] {
        let response = get(&app, uri, Some(&auth)).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.json();
        assert!(body["msg"].is_string());
        assert!(body.get("data").is_none());
    }
}
