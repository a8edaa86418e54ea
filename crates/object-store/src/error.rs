//! Error types for the object storage client.

/// Errors that can occur when talking to the object store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Object storage error reported by the backend
    #[error("object storage error: {0}")]
    ObjectStore(object_store::Error),

    /// Object not found
    #[error("object not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key that cannot be addressed in the store
    #[error("invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Bucket name that cannot be addressed
    #[error("invalid bucket name '{0}'")]
    InvalidBucket(String),

    /// Bucket does not exist on the endpoint
    #[error("bucket '{0}' does not exist")]
    BucketNotFound(String),

    /// The inbound byte stream failed before the put could complete
    #[error("failed to read request body: {0}")]
    Body(String),

    /// More bytes moved than the transfer declared
    #[error("transfer exceeded its declared size: expected {expected} bytes, got at least {actual}")]
    SizeExceeded { expected: u64, actual: u64 },

    /// The object changed between opening it and reading its metadata
    #[error("object '{key}' changed while open: opened {opened} bytes, now {current} bytes")]
    Changed {
        key: String,
        opened: u64,
        current: u64,
    },
}

impl From<object_store::Error> for StoreError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound(path),
            other => StoreError::ObjectStore(other),
        }
    }
}

impl StoreError {
    /// Whether the error means the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type alias for object storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
