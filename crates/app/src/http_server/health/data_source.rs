use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use store::{Storage, StoreError};

use crate::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("bucket '{0}' does not exist")]
    MissingBucket(String),

    #[error("object store isn't available: {0}")]
    StoreUnavailable(String),
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ready when the configured default bucket can be listed.
struct StoreSource {
    storage: Storage,
    bucket: String,
}

#[async_trait]
impl DataSource for StoreSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        self.storage.probe(&self.bucket).await.map_err(|e| match e {
            StoreError::BucketNotFound(bucket) => DataSourceError::MissingBucket(bucket),
            e => DataSourceError::StoreUnavailable(e.to_string()),
        })
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(StoreSource {
            storage: state.storage().clone(),
            bucket: state.config().store.default_bucket.clone(),
        })))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Clone)]
    pub(crate) enum MockReadiness {
        Ready,
        MissingBucket,
        Unreachable,
        Hanging,
    }

    #[async_trait]
    impl DataSource for MockReadiness {
        async fn is_ready(&self) -> Result<(), DataSourceError> {
            match self {
                MockReadiness::Ready => Ok(()),
                MockReadiness::MissingBucket => {
                    Err(DataSourceError::MissingBucket("uploads".into()))
                }
                MockReadiness::Unreachable => Err(DataSourceError::StoreUnavailable(
                    "connection refused".into(),
                )),
                MockReadiness::Hanging => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }

    #[tokio::test]
    async fn test_store_source_reports_unreachable_bucket() {
        let storage = Storage::new(store::StoreConfig::Memory, None);
        let ready = StoreSource {
            storage: storage.clone(),
            bucket: "uploads".into(),
        };
        assert!(ready.is_ready().await.is_ok());

        let invalid = StoreSource {
            storage,
            bucket: "..".into(),
        };
        assert!(matches!(
            invalid.is_ready().await,
            Err(DataSourceError::StoreUnavailable(_))
        ));
    }
}
