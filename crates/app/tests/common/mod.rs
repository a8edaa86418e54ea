//! Shared helpers for driving the router in-process
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use bytes::{Bytes, BytesMut};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use bucketgate::http_server;
use bucketgate::{Config, ServiceState};
use store::testing::{FaultyStore, Faults};
use store::{Storage, StoreConfig, StoreError};

pub const BOUNDARY: &str = "bucketgate-test-boundary";

/// Router over in-memory buckets, plus the state for seeding objects.
pub fn setup() -> (Router, ServiceState) {
    let config = Config::default();
    let storage = Storage::new(StoreConfig::Memory, None);
    let state = ServiceState::new(storage, config);
    let server_config = http_server::Config::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    (http_server::router(&server_config, state.clone()), state)
}

/// Like [`setup`], but `bucket` is served by a store that fails on demand.
pub fn setup_faulty(bucket: &str, faults: Faults) -> (Router, Arc<FaultyStore>) {
    let (app, state) = setup();
    let store = Arc::new(FaultyStore::new(faults, 64 * 1024));
    state.storage().insert_bucket(bucket, store.clone());
    (app, store)
}

/// A token signed with a key the gateway never sees.
pub fn token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"identity-provider-secret"),
    )
    .unwrap()
}

pub fn bearer(claims: Value) -> String {
    format!("Bearer {}", token(claims))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Response whose body may end in an error after some bytes arrived.
pub struct StreamedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub received: Bytes,
    pub failed: bool,
}

/// Read the body frame by frame, keeping whatever arrived before a failure.
pub async fn get_streamed(app: &Router, uri: &str, auth: &str) -> StreamedResponse {
    let request = Request::get(uri)
        .header(AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();

    let mut body = response.into_body();
    let mut received = BytesMut::new();
    let mut failed = false;
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    received.extend_from_slice(&data);
                }
            }
            Err(_) => {
                failed = true;
                break;
            }
        }
    }

    StreamedResponse {
        status,
        headers,
        received: received.freeze(),
        failed,
    }
}

pub async fn get(app: &Router, uri: &str, auth: Option<&str>) -> TestResponse {
    let mut builder = Request::get(uri);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

pub async fn delete(app: &Router, uri: &str, auth: &str) -> TestResponse {
    let request = Request::delete(uri)
        .header(AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, auth: &str, body: Value) -> TestResponse {
    let request = Request::post(uri)
        .header(AUTHORIZATION, auth)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Multipart form with a single file part.
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn upload(app: &Router, uri: &str, auth: &str, form: Vec<u8>) -> TestResponse {
    let request = Request::post(uri)
        .header(AUTHORIZATION, auth)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(form))
        .unwrap();
    send(app, request).await
}

/// Store an object directly, bypassing the HTTP layer.
pub async fn seed(state: &ServiceState, bucket: &str, key: &str, data: Vec<u8>) {
    let body = futures::stream::iter(vec![Ok::<_, StoreError>(Bytes::from(data))]);
    state
        .storage()
        .put(bucket, key, body, None)
        .await
        .unwrap();
}
