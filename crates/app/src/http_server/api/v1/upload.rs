use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Query, State};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use store::{LogProgress, ProgressStream, StoreError, TransferSession, PATH_SEPARATOR};

use crate::http_server::auth::AuthorizedBucket;
use crate::http_server::envelope;
use crate::ServiceState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadRequest {
    /// Folder to place the file in
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub bucket: String,
    /// Key the store confirmed, as listings will show it
    pub key: String,
    pub etag: Option<String>,
    pub size: u64,
    /// Key derived from the prefix and filename
    pub object_name: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    AuthorizedBucket(bucket): AuthorizedBucket,
    Query(req): Query<UploadRequest>,
    mut multipart: Multipart,
) -> Result<Response, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::MissingFile(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let response = ingest(&state, bucket, req.prefix.as_deref(), field).await?;
        return Ok(envelope::success(response));
    }

    Err(UploadError::MissingFile(format!(
        "no '{}' field in form",
        FILE_FIELD
    )))
}

/// Stream one multipart field into the store.
async fn ingest(
    state: &ServiceState,
    bucket: String,
    prefix: Option<&str>,
    field: Field<'_>,
) -> Result<UploadResponse, UploadError> {
    let filename = field
        .file_name()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| UploadError::MissingFile("file field has no filename".into()))?;
    let content_type = field.content_type().map(str::to_string);
    let object_name = object_key(prefix.unwrap_or_default(), &filename);

    let label = format!("{}/{}", bucket, object_name);
    let session =
        TransferSession::new(None).with_observer(Arc::new(LogProgress::new(label, None)));
    let body = ProgressStream::new(
        Box::pin(field.map_err(|e| StoreError::Body(e.to_string()))),
        session,
    );

    let info = state
        .storage()
        .put(&bucket, &object_name, body, content_type.as_deref())
        .await?;

    Ok(UploadResponse {
        bucket: info.bucket,
        key: info.key,
        etag: info.etag,
        size: info.size,
        object_name,
    })
}

/// Key for an uploaded file: `filename` alone, or `/<prefix>/<filename>`.
fn object_key(prefix: &str, filename: &str) -> String {
    let prefix = prefix.trim_matches(PATH_SEPARATOR);
    if prefix.is_empty() {
        filename.to_string()
    } else {
        format!(
            "{sep}{}{sep}{}",
            prefix,
            filename,
            sep = PATH_SEPARATOR
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to get file: {0}")]
    MissingFile(String),
    #[error("failed to upload file: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match &self {
            UploadError::MissingFile(_)
            | UploadError::Store(StoreError::Body(_))
            | UploadError::Store(StoreError::InvalidKey { .. }) => StatusCode::BAD_REQUEST,
            UploadError::Store(e) => {
                tracing::error!("upload failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        envelope::failure(status, self.to_string())
    }
}
