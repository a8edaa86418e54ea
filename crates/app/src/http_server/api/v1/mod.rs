use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;

use crate::http_server::auth::{bucket, claims};
use crate::ServiceState;

pub mod delete;
pub mod download;
pub mod list;
pub mod upload;

/// Every route requires a token whose groups include the `bucket` query parameter.
pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/list", get(list::handler_get).post(list::handler))
        .route("/download/*key", get(download::handler))
        .route("/download-p/*key", get(download::handler_progressive))
        .route("/upload", post(upload::handler))
        .route("/delete", axum::routing::delete(delete::handler))
        .route_layer(from_fn(bucket::middleware))
        .route_layer(from_fn(claims::middleware))
        .with_state(state)
}
