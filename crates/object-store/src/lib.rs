//! Multi-bucket object storage client
//!
//! This crate wraps the `object_store` crate behind a client that can address
//! any bucket on an S3-compatible endpoint (S3, MinIO, ...), a local directory
//! tree or an in-memory store. On top of the raw store it provides:
//!
//! - Listings as [`ObjectDescriptor`]s with folder inference and suffix filtering
//! - Streaming reads through an [`ObjectReader`] handle that is released on drop
//! - Puts streamed from a byte stream as multipart uploads, visible only once complete
//! - Byte-level progress reporting through [`ProgressObserver`]
//!
//! # Example
//!
//! ```rust,no_run
//! use bucketgate_object_store::{ListOptions, StoreConfig, Storage};
//!
//! # async fn example() -> Result<(), bucketgate_object_store::StoreError> {
//! let storage = Storage::connect(StoreConfig::Memory, None, "uploads").await?;
//! let objects = storage.list("uploads", &ListOptions::default()).await?;
//! assert!(objects.is_empty());
//! # Ok(())
//! # }
//! ```

mod descriptor;
mod error;
mod progress;
mod reader;
mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use descriptor::{FileType, ObjectDescriptor, PATH_SEPARATOR};
pub use error::{Result, StoreError};
pub use progress::{LogProgress, ProgressObserver, ProgressStream, TransferSession};
pub use reader::{ObjectReader, ObjectStat};
pub use storage::{ListOptions, PutInfo, Storage, StoreConfig, DEFAULT_CONTENT_TYPE};
