use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Deserialize;

use store::StoreError;

use crate::http_server::auth::AuthorizedBucket;
use crate::http_server::envelope;
use crate::ServiceState;

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    /// Key of the object to remove
    #[serde(default)]
    pub object: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    AuthorizedBucket(bucket): AuthorizedBucket,
    Query(req): Query<DeleteRequest>,
) -> Result<Response, DeleteError> {
    let object = req
        .object
        .filter(|object| !object.is_empty())
        .ok_or(DeleteError::MissingObject)?;

    state.storage().delete(&bucket, &object).await?;

    Ok(envelope::success(format!(
        "Object {} deleted successfully from bucket {}",
        object, bucket
    )))
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("missing object parameter")]
    MissingObject,
    #[error("failed to delete object: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for DeleteError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeleteError::MissingObject | DeleteError::Store(StoreError::InvalidKey { .. }) => {
                StatusCode::BAD_REQUEST
            }
            DeleteError::Store(e) => {
                tracing::error!("delete failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        envelope::failure(status, self.to_string())
    }
}
