/// Errors that can occur during image storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No image is stored under the given reference.
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The reference string is not a 64-character hex SHA-256.
    #[error("invalid image reference: {0}")]
    InvalidRef(String),
    #[error("image exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
    #[error("image is empty")]
    Empty,
}
