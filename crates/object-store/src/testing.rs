//! In-memory store with injectable read and list failures.
//!
//! Only compiled for tests and under the `test-utils` feature.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, GetResultPayload, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOpts, PutOptions, PutPayload, PutResult, Result,
};

const STORE_NAME: &str = "FaultyStore";

/// Failures a [`FaultyStore`] injects.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Fail every object read after this many chunks
    pub read_after_chunks: Option<usize>,
    /// Fail every recursive listing after this many entries, and every
    /// delimited listing outright
    pub list_after_entries: Option<usize>,
}

/// [`InMemory`] wrapper that re-chunks reads, counts open bodies and fails
/// on demand.
#[derive(Debug)]
pub struct FaultyStore {
    inner: InMemory,
    faults: Faults,
    chunk_size: usize,
    open_bodies: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(faults: Faults, chunk_size: usize) -> Self {
        Self {
            inner: InMemory::new(),
            faults,
            chunk_size: chunk_size.max(1),
            open_bodies: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Object bodies handed out and not yet dropped.
    pub fn open_bodies(&self) -> usize {
        self.open_bodies.load(Ordering::SeqCst)
    }

    /// Seed an object directly, bypassing any fault.
    pub async fn seed(&self, key: &str, data: impl Into<Bytes>) -> Result<()> {
        let location = Path::parse(key)?;
        let data: Bytes = data.into();
        self.inner.put(&location, data.into()).await?;
        Ok(())
    }

    fn injected(what: &str) -> object_store::Error {
        object_store::Error::Generic {
            store: STORE_NAME,
            source: format!("injected {} failure", what).into(),
        }
    }

    fn wrap_body(
        &self,
        body: BoxStream<'static, Result<Bytes>>,
    ) -> BoxStream<'static, Result<Bytes>> {
        let chunk_size = self.chunk_size;
        let rechunked = body.flat_map(move |item| {
            let pieces: Vec<Result<Bytes>> = match item {
                Ok(bytes) => split(bytes, chunk_size).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(pieces)
        });

        let limited: BoxStream<'static, Result<Bytes>> = match self.faults.read_after_chunks {
            Some(limit) => rechunked
                .take(limit)
                .chain(stream::once(async { Err(Self::injected("read")) }))
                .boxed(),
            None => rechunked.boxed(),
        };

        let guard = OpenBody::new(self.open_bodies.clone());
        limited
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed()
    }
}

fn split(mut bytes: Bytes, chunk_size: usize) -> Vec<Bytes> {
    let mut pieces = Vec::new();
    while bytes.len() > chunk_size {
        pieces.push(bytes.split_to(chunk_size));
    }
    if !bytes.is_empty() {
        pieces.push(bytes);
    }
    pieces
}

/// Counts one open body until dropped.
struct OpenBody(Arc<AtomicUsize>);

impl OpenBody {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for OpenBody {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Display for FaultyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", STORE_NAME, self.inner)
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> Result<GetResult> {
        let result = self.inner.get_opts(location, options).await?;
        let payload = match result.payload {
            GetResultPayload::Stream(body) => GetResultPayload::Stream(self.wrap_body(body)),
            file @ GetResultPayload::File(..) => file,
        };
        Ok(GetResult { payload, ..result })
    }

    async fn head(&self, location: &Path) -> Result<ObjectMeta> {
        self.inner.head(location).await
    }

    async fn delete(&self, location: &Path) -> Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, Result<ObjectMeta>> {
        let listing = self.inner.list(prefix);
        match self.faults.list_after_entries {
            Some(limit) => listing
                .take(limit)
                .chain(stream::once(async { Err(Self::injected("list")) }))
                .boxed(),
            None => listing,
        }
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> Result<ListResult> {
        if self.faults.list_after_entries.is_some() {
            return Err(Self::injected("list"));
        }
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}
