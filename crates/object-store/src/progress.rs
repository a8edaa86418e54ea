//! Byte-level progress tracking for uploads and downloads.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::StoreError;

/// Receives the cumulative number of bytes moved by a transfer.
///
/// Called synchronously after every chunk, so implementations should be cheap.
pub trait ProgressObserver: Send + Sync {
    fn on_bytes_read(&self, cumulative: u64);
}

/// State of a single upload or download.
pub struct TransferSession {
    total: Option<u64>,
    transferred: u64,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferSession")
            .field("total", &self.total)
            .field("transferred", &self.transferred)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl TransferSession {
    /// Start a session; `total` is `None` when the size is not known up front.
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total,
            transferred: 0,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Record `len` more bytes and notify the observer.
    ///
    /// Fails without recording anything if the declared total would be exceeded.
    pub fn advance(&mut self, len: usize) -> Result<u64, StoreError> {
        let next = self.transferred + len as u64;
        if let Some(total) = self.total {
            if next > total {
                return Err(StoreError::SizeExceeded {
                    expected: total,
                    actual: next,
                });
            }
        }

        self.transferred = next;
        if let Some(observer) = &self.observer {
            observer.on_bytes_read(next);
        }
        Ok(next)
    }
}

fn percent_of(transferred: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(0) => Some(100.0),
        Some(total) => Some(transferred as f64 / total as f64 * 100.0),
        None => None,
    }
}

/// Counting wrapper around a byte stream.
///
/// Every chunk that passes through is recorded on the [`TransferSession`],
/// which in turn notifies its observer with the running total.
#[derive(Debug)]
pub struct ProgressStream<S> {
    inner: S,
    session: TransferSession,
    failed: bool,
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, session: TransferSession) -> Self {
        Self {
            inner,
            session,
            failed: false,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, StoreError>> + Unpin,
{
    type Item = Result<Bytes, StoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.failed {
            return Poll::Ready(None);
        }

        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => match self.session.advance(chunk.len()) {
                Ok(_) => Poll::Ready(Some(Ok(chunk))),
                Err(e) => {
                    self.failed = true;
                    Poll::Ready(Some(Err(e)))
                }
            },
            Poll::Ready(Some(Err(e))) => {
                self.failed = true;
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }
}

/// Observer that reports progress through `tracing`.
#[derive(Debug, Clone)]
pub struct LogProgress {
    label: String,
    total: Option<u64>,
}

impl LogProgress {
    pub fn new(label: impl Into<String>, total: Option<u64>) -> Self {
        Self {
            label: label.into(),
            total,
        }
    }
}

impl ProgressObserver for LogProgress {
    fn on_bytes_read(&self, cumulative: u64) {
        match percent_of(cumulative, self.total) {
            Some(percent) => tracing::trace!(
                transfer = %self.label,
                bytes = cumulative,
                "progress: {:.2}%",
                percent
            ),
            None => tracing::trace!(transfer = %self.label, bytes = cumulative, "progress"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::stream;
    use futures::TryStreamExt;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u64>>);

    impl ProgressObserver for Recorder {
        fn on_bytes_read(&self, cumulative: u64) {
            self.0.lock().push(cumulative);
        }
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, StoreError>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_reports_cumulative_bytes_per_chunk() {
        let recorder = Arc::new(Recorder::default());
        let session = TransferSession::new(Some(9)).with_observer(recorder.clone());
        let stream = ProgressStream::new(chunks(&["abc", "", "defgh", "i"]), session);

        let collected: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(collected.concat(), b"abcdefghi");
        assert_eq!(*recorder.0.lock(), vec![3, 3, 8, 9]);
    }

    #[tokio::test]
    async fn test_stops_when_declared_total_is_exceeded() {
        let session = TransferSession::new(Some(4));
        let mut stream = ProgressStream::new(chunks(&["abc", "def", "ghi"]), session);

        assert!(stream.try_next().await.unwrap().is_some());
        let err = stream.try_next().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::SizeExceeded {
                expected: 4,
                actual: 6
            }
        ));
        assert_eq!(stream.session.transferred, 3);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_total_is_never_exceeded() {
        let mut stream = ProgressStream::new(chunks(&["abcd", "efgh"]), TransferSession::new(None));
        while stream.try_next().await.unwrap().is_some() {}
        assert_eq!(stream.session.transferred, 8);
        assert_eq!(stream.session.total, None);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent_of(50, Some(200)), Some(25.0));
        assert_eq!(percent_of(0, Some(0)), Some(100.0));
        assert_eq!(percent_of(50, None), None);
    }
}
