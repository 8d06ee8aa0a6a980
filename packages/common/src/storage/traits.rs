use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;
use super::image_ref::ImageRef;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Binary image storage. Uploads return a stable reference; storing the
/// same bytes twice yields the same reference.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the bytes and return their reference.
    async fn put(&self, data: &[u8]) -> Result<ImageRef, StorageError>;

    /// Open a stored image for streaming.
    async fn open(&self, image: &ImageRef) -> Result<BoxReader, StorageError>;

    async fn exists(&self, image: &ImageRef) -> Result<bool, StorageError>;

    /// Returns `true` if the image was deleted, `false` if it did not exist.
    async fn delete(&self, image: &ImageRef) -> Result<bool, StorageError>;
}
