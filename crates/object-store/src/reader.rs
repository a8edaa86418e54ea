//! Open object handles.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use object_store::path::Path as ObjectPath;
use object_store::{GetResult, ObjectStore};

use crate::error::{Result, StoreError};

/// Metadata of an open object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: Option<String>,
}

/// Handle to an object opened for reading.
///
/// The handle owns the store's response body. Dropping it, whether after the
/// last chunk, on an error or because the consumer went away, releases the
/// underlying connection.
pub struct ObjectReader {
    bucket: String,
    key: String,
    location: ObjectPath,
    store: Arc<dyn ObjectStore>,
    opened_size: u64,
    body: BoxStream<'static, object_store::Result<Bytes>>,
}

impl fmt::Debug for ObjectReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectReader")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("opened_size", &self.opened_size)
            .finish()
    }
}

impl ObjectReader {
    pub(crate) fn new(
        bucket: &str,
        key: &str,
        location: ObjectPath,
        store: Arc<dyn ObjectStore>,
        result: GetResult,
    ) -> Self {
        tracing::debug!(bucket, key, size = result.meta.size, "object handle opened");
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            location,
            store,
            opened_size: result.meta.size as u64,
            body: result.into_stream(),
        }
    }

    /// Ask the store for the object's current metadata.
    ///
    /// Fails if the store cannot report it, or if the object was replaced
    /// with one of a different size since it was opened. The returned future
    /// owns what it needs, so the reader is not borrowed while it runs.
    pub fn stat(&self) -> impl Future<Output = Result<ObjectStat>> + Send + 'static {
        let store = self.store.clone();
        let location = self.location.clone();
        let key = self.key.clone();
        let opened = self.opened_size;

        async move {
            let meta = store.head(&location).await?;
            let current = meta.size as u64;
            if current != opened {
                return Err(StoreError::Changed {
                    key,
                    opened,
                    current,
                });
            }

            Ok(ObjectStat {
                key,
                size: current,
                last_modified: meta.last_modified,
                etag: meta.e_tag,
            })
        }
    }

    /// Drain the whole object into memory.
    pub async fn read_to_end(mut self) -> Result<Bytes> {
        let mut buffer = BytesMut::with_capacity(self.opened_size as usize);
        while let Some(chunk) = self.try_next().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer.freeze())
    }
}

impl Stream for ObjectReader {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.body
            .poll_next_unpin(cx)
            .map(|chunk| chunk.map(|r| r.map_err(StoreError::from)))
    }
}

impl Drop for ObjectReader {
    fn drop(&mut self) {
        tracing::debug!(bucket = %self.bucket, key = %self.key, "object handle released");
    }
}
