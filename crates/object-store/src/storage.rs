//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ClientOptions, ObjectStore, PutMultipartOpts, WriteMultipart,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::descriptor::{ObjectDescriptor, PATH_SEPARATOR};
use crate::error::{Result, StoreError};
use crate::reader::ObjectReader;

/// Content type used when the caller does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Upload parts in flight per put before the body is polled again.
const MAX_CONCURRENT_PARTS: usize = 4;

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory storage, one store per bucket (for testing)
    #[default]
    Memory,

    /// Local filesystem storage, one directory per bucket
    Local {
        /// Directory holding the bucket directories
        root: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Optional session token for temporary credentials
        #[serde(default)]
        session_token: Option<String>,
        /// Optional region (defaults to "us-east-1")
        #[serde(default)]
        region: Option<String>,
    },
}

impl StoreConfig {
    /// Whether puts can carry object attributes such as the content type.
    fn supports_attributes(&self) -> bool {
        !matches!(self, StoreConfig::Local { .. })
    }
}

/// Options for [`Storage::list`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    /// Only list keys under this prefix
    #[serde(default)]
    pub prefix: Option<String>,
    /// Only keep keys ending with this suffix
    #[serde(default)]
    pub suffix: Option<String>,
    /// Descend into sub-folders instead of reporting them as folder entries
    #[serde(default)]
    pub recursive: bool,
}

/// Store-confirmed result of a put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutInfo {
    pub bucket: String,
    /// Key the object was stored under, as later listings report it
    pub key: String,
    pub etag: Option<String>,
    pub size: u64,
}

/// Client for every bucket reachable through one configured endpoint.
///
/// Cheap to clone; clones share the per-bucket handle cache. Each handle
/// manages its own connection pool and is safe to use from many tasks.
#[derive(Debug, Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

#[derive(Debug)]
struct StorageInner {
    config: StoreConfig,
    timeout: Option<Duration>,
    buckets: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl Storage {
    /// Build a client without touching the network.
    pub fn new(config: StoreConfig, timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                config,
                timeout,
                buckets: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Build a client and verify that `probe_bucket` is reachable.
    pub async fn connect(
        config: StoreConfig,
        timeout: Option<Duration>,
        probe_bucket: &str,
    ) -> Result<Self> {
        let storage = Self::new(config, timeout);
        storage.probe(probe_bucket).await?;
        tracing::info!(bucket = probe_bucket, "object store reachable");
        Ok(storage)
    }

    /// Verify a bucket exists by listing (empty prefix).
    /// This will fail fast if the bucket doesn't exist.
    pub async fn probe(&self, bucket: &str) -> Result<()> {
        let store = self.bucket(bucket)?;
        let mut stream = store.list(None);
        match stream.try_next().await {
            Ok(_) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => {
                Err(StoreError::BucketNotFound(bucket.to_string()))
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("NoSuchBucket") {
                    return Err(StoreError::BucketNotFound(bucket.to_string()));
                }
                Err(e.into())
            }
        }
    }

    /// Serve `bucket` from a pre-built store instead of one derived from the config.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn insert_bucket(&self, bucket: &str, store: Arc<dyn ObjectStore>) {
        self.inner.buckets.write().insert(bucket.to_string(), store);
    }

    /// Handle for a bucket, built on first use and cached afterwards.
    fn bucket(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        if bucket.is_empty() || bucket == "." || bucket == ".." || bucket.contains(['/', '\\']) {
            return Err(StoreError::InvalidBucket(bucket.to_string()));
        }
        if let Some(store) = self.inner.buckets.read().get(bucket) {
            return Ok(store.clone());
        }

        let store = self.build_store(bucket)?;
        let mut buckets = self.inner.buckets.write();
        Ok(buckets
            .entry(bucket.to_string())
            .or_insert(store)
            .clone())
    }

    fn build_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let store: Arc<dyn ObjectStore> = match &self.inner.config {
            StoreConfig::Memory => Arc::new(InMemory::new()),

            StoreConfig::Local { root } => {
                let path = root.join(bucket);
                std::fs::create_dir_all(&path)?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(&path)
                        .map_err(|e| StoreError::InvalidConfig(e.to_string()))?,
                )
            }

            StoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                session_token,
                region,
            } => {
                let mut client_options = ClientOptions::new();
                if let Some(timeout) = self.inner.timeout {
                    client_options = client_options.with_timeout(timeout);
                }

                let mut builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"))
                    .with_client_options(client_options);

                if let Some(token) = session_token.as_deref().filter(|t| !t.is_empty()) {
                    builder = builder.with_token(token);
                }

                Arc::new(
                    builder
                        .build()
                        .map_err(|e| StoreError::InvalidConfig(e.to_string()))?,
                )
            }
        };

        tracing::debug!(bucket, "built object store handle");
        Ok(store)
    }

    /// List the objects of a bucket.
    ///
    /// The prefix is matched against raw keys, so `rep` selects `reports/x.txt`.
    /// A delimited listing reports the common prefixes first and the objects
    /// after them, each group in the order the store yields it. Any store
    /// error aborts the listing and nothing gathered so far is returned.
    pub async fn list(&self, bucket: &str, options: &ListOptions) -> Result<Vec<ObjectDescriptor>> {
        let store = self.bucket(bucket)?;
        let prefix = KeyPrefix::parse(options.prefix.as_deref())?;
        let keep = |descriptor: &ObjectDescriptor| {
            prefix.matches(&descriptor.key)
                && match options.suffix.as_deref() {
                    Some(suffix) if !suffix.is_empty() => descriptor.has_suffix(suffix),
                    _ => true,
                }
        };

        let mut objects = Vec::new();
        if options.recursive {
            let mut stream = store.list(prefix.parent.as_ref());
            while let Some(meta) = stream.try_next().await? {
                let descriptor = ObjectDescriptor::from(meta);
                if keep(&descriptor) {
                    objects.push(descriptor);
                }
            }
        } else {
            let listing = store.list_with_delimiter(prefix.parent.as_ref()).await?;
            let folders = listing
                .common_prefixes
                .iter()
                .map(|p| ObjectDescriptor::folder(p.as_ref()));
            let files = listing.objects.into_iter().map(ObjectDescriptor::from);
            objects.extend(folders.chain(files).filter(|d| keep(d)));
        }

        tracing::debug!(
            bucket,
            prefix = ?options.prefix,
            suffix = ?options.suffix,
            recursive = options.recursive,
            count = objects.len(),
            "list objects"
        );
        Ok(objects)
    }

    /// Open an object for reading.
    pub async fn open(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let store = self.bucket(bucket)?;
        let location = parse_object_key(key)?;
        let result = store.get(&location).await?;
        Ok(ObjectReader::new(bucket, key, location, store, result))
    }

    /// Metadata of a single object.
    pub async fn head(&self, bucket: &str, key: &str) -> Result<ObjectDescriptor> {
        let store = self.bucket(bucket)?;
        let location = parse_object_key(key)?;
        let meta = store.head(&location).await?;
        Ok(ObjectDescriptor::from(meta))
    }

    /// Stream the bytes of `body` into the store under `key`.
    ///
    /// Chunks are forwarded as multipart upload parts while the body is still
    /// being read. The object only becomes visible once the upload completes;
    /// a failing body aborts the upload and leaves nothing behind.
    pub async fn put<S>(
        &self,
        bucket: &str,
        key: &str,
        body: S,
        content_type: Option<&str>,
    ) -> Result<PutInfo>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        let store = self.bucket(bucket)?;
        let location = parse_object_key(key)?;

        let content_type = content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let mut options = PutMultipartOpts::default();
        if self.inner.config.supports_attributes() {
            options.attributes = Attributes::from_iter([(Attribute::ContentType, content_type)]);
        }

        let upload = store.put_multipart_opts(&location, options).await?;
        let mut writer = WriteMultipart::new(upload);
        let size = match forward(&mut writer, body).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(abort) = writer.abort().await {
                    tracing::warn!(bucket, key, "failed to abort upload: {}", abort);
                }
                return Err(e);
            }
        };
        let result = writer.finish().await?;

        let stored = location.to_string();
        tracing::info!(bucket, key = %stored, size, "put object");

        Ok(PutInfo {
            bucket: bucket.to_string(),
            key: stored,
            etag: result.e_tag,
            size,
        })
    }

    /// Remove an object.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let store = self.bucket(bucket)?;
        let location = parse_object_key(key)?;
        store.delete(&location).await?;
        tracing::info!(bucket, key, "delete object");
        Ok(())
    }
}

fn parse_key(key: &str) -> Result<ObjectPath> {
    ObjectPath::parse(key).map_err(|e| StoreError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Like [`parse_key`], but the key must name an object.
///
/// A key ending in the separator names a folder, which the store cannot
/// hold as an object of its own.
fn parse_object_key(key: &str) -> Result<ObjectPath> {
    let invalid = |reason: &str| StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.ends_with(PATH_SEPARATOR) {
        return Err(invalid("key names a folder"));
    }
    let location = parse_key(key)?;
    if location.as_ref().is_empty() {
        return Err(invalid("key is empty"));
    }
    Ok(location)
}

/// Write every chunk of `body` to `writer`, returning the byte count.
async fn forward<S>(writer: &mut WriteMultipart, body: S) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>>,
{
    let mut body = std::pin::pin!(body);
    let mut size = 0;
    while let Some(chunk) = body.try_next().await? {
        writer.wait_for_capacity(MAX_CONCURRENT_PARTS).await?;
        size += chunk.len() as u64;
        writer.put(chunk);
    }
    Ok(size)
}

/// Listing prefix matched against raw keys.
///
/// The store can only list whole path segments, so listings start at the
/// deepest complete segment of the prefix and the rest is matched by string.
#[derive(Debug)]
struct KeyPrefix {
    raw: String,
    parent: Option<ObjectPath>,
}

impl KeyPrefix {
    fn parse(prefix: Option<&str>) -> Result<Self> {
        let raw = prefix.unwrap_or_default();
        // Stored keys never start with the separator.
        let raw = raw.strip_prefix(PATH_SEPARATOR).unwrap_or(raw);
        let parent = match raw.rfind(PATH_SEPARATOR) {
            Some(end) => Some(parse_key(&raw[..end])?),
            None => None,
        };
        Ok(Self {
            raw: raw.to_string(),
            parent,
        })
    }

    fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.raw)
    }
}
