use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};

use store::{LogProgress, ProgressStream, StoreError, TransferSession, DEFAULT_CONTENT_TYPE};

use crate::http_server::auth::AuthorizedBucket;
use crate::http_server::envelope;
use crate::ServiceState;

/// Buffered download: the whole object is read before the response starts.
pub async fn handler(
    State(state): State<ServiceState>,
    AuthorizedBucket(bucket): AuthorizedBucket,
    Path(key): Path<String>,
) -> Result<Response, DownloadError> {
    let reader = state
        .storage()
        .open(&bucket, &key)
        .await
        .map_err(DownloadError::open)?;
    let data = reader.read_to_end().await.map_err(DownloadError::Read)?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE))],
        data,
    )
        .into_response())
}

/// Progressive download: headers go out first, then the object is relayed
/// chunk by chunk.
///
/// A failure after the first byte cannot change the status any more. It is
/// logged and the body is cut short of its declared `Content-Length`.
pub async fn handler_progressive(
    State(state): State<ServiceState>,
    AuthorizedBucket(bucket): AuthorizedBucket,
    Path(key): Path<String>,
) -> Result<Response, DownloadError> {
    let reader = state
        .storage()
        .open(&bucket, &key)
        .await
        .map_err(DownloadError::open)?;
    let stat = reader.stat().await.map_err(DownloadError::Stat)?;

    let label = format!("{}/{}", bucket, key);
    let observer = Arc::new(LogProgress::new(label.clone(), Some(stat.size)));
    let session = TransferSession::new(Some(stat.size)).with_observer(observer);
    let body = ProgressStream::new(reader, session).inspect_err(move |e| {
        tracing::error!(transfer = %label, "download stream failed: {}", e);
    });

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", key))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_DISPOSITION, disposition),
            (CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
            (CONTENT_LENGTH, HeaderValue::from(stat.size)),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object key: {0}")]
    InvalidKey(StoreError),
    #[error("failed to open object: {0}")]
    ObjectStore(StoreError),
    #[error("failed to read object: {0}")]
    Read(StoreError),
    #[error("failed to stat object: {0}")]
    Stat(StoreError),
}

impl DownloadError {
    fn open(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => DownloadError::NotFound(key),
            e @ StoreError::InvalidKey { .. } => DownloadError::InvalidKey(e),
            e => DownloadError::ObjectStore(e),
        }
    }
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        let status = match &self {
            DownloadError::NotFound(_) => StatusCode::NOT_FOUND,
            DownloadError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            DownloadError::ObjectStore(_) | DownloadError::Read(_) | DownloadError::Stat(_) => {
                tracing::error!("download failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        envelope::failure(status, self.to_string())
    }
}
