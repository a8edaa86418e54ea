use axum::extract::{Json, Query, State};
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use store::{ListOptions, ObjectDescriptor, StoreError};

use crate::http_server::auth::AuthorizedBucket;
use crate::http_server::envelope;
use crate::ServiceState;

pub type ListResponse = Vec<ObjectDescriptor>;

// Query GET handler
pub async fn handler_get(
    State(state): State<ServiceState>,
    AuthorizedBucket(bucket): AuthorizedBucket,
    Query(req): Query<ListOptions>,
) -> Result<Response, ListError> {
    handle_list_request(state, bucket, req).await
}

// JSON POST handler
pub async fn handler(
    State(state): State<ServiceState>,
    AuthorizedBucket(bucket): AuthorizedBucket,
    Json(req): Json<ListOptions>,
) -> Result<Response, ListError> {
    handle_list_request(state, bucket, req).await
}

async fn handle_list_request(
    state: ServiceState,
    bucket: String,
    req: ListOptions,
) -> Result<Response, ListError> {
    let objects: ListResponse = state.storage().list(&bucket, &req).await?;
    Ok(envelope::success(objects))
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("failed to list objects: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ListError {
    fn into_response(self) -> Response {
        match &self {
            ListError::Store(StoreError::InvalidKey { .. }) => {
                envelope::failure(StatusCode::BAD_REQUEST, self.to_string())
            }
            ListError::Store(e) => {
                tracing::error!("list failed: {}", e);
                envelope::failure(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
    }
}
