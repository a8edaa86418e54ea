use axum::async_trait;
use axum::extract::{FromRequestParts, Query, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use http::StatusCode;
use serde::Deserialize;

use super::context::AuthContext;
use crate::http_server::envelope;

#[derive(Debug, Deserialize)]
struct BucketQuery {
    #[serde(default)]
    bucket: Option<String>,
}

/// The `bucket` query parameter, if present and non-empty.
fn requested_bucket(request: &Request) -> Option<String> {
    Query::<BucketQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.bucket)
        .filter(|bucket| !bucket.is_empty())
}

/// Route layer: authorize the `bucket` query parameter against the caller's groups.
///
/// Must run after the claims layer.
pub async fn middleware(mut request: Request, next: Next) -> Result<Response, BucketError> {
    let bucket = requested_bucket(&request).ok_or(BucketError::MissingBucket)?;
    let context = request
        .extensions_mut()
        .get_mut::<AuthContext>()
        .ok_or(BucketError::Unauthorized)?;

    let authorized = context.authorize(&bucket).map(|_| ());
    if let Err(e) = authorized {
        tracing::warn!(%bucket, groups = ?context.claims().groups(), "bucket access denied");
        return Err(e);
    }

    tracing::debug!(%bucket, "bucket authorized");
    Ok(next.run(request).await)
}

/// The bucket the caller was authorized for.
#[derive(Debug, Clone)]
pub struct AuthorizedBucket(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthorizedBucket
where
    S: Send + Sync,
{
    type Rejection = BucketError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(AuthContext::bucket)
            .map(|bucket| AuthorizedBucket(bucket.to_string()))
            .ok_or(BucketError::Unauthorized)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BucketError {
    #[error("missing bucket parameter")]
    MissingBucket,
    #[error("unauthorized")]
    Unauthorized,
    #[error("token groups are not usable for authorization")]
    InvalidGroupsType,
    #[error("access to bucket {0} is forbidden")]
    Forbidden(String),
}

impl BucketError {
    pub fn status(&self) -> StatusCode {
        match self {
            BucketError::MissingBucket => StatusCode::BAD_REQUEST,
            BucketError::Unauthorized => StatusCode::UNAUTHORIZED,
            BucketError::InvalidGroupsType | BucketError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for BucketError {
    fn into_response(self) -> Response {
        envelope::failure(self.status(), self.to_string())
    }
}
