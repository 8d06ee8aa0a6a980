//! Content-addressed storage for event images.
//!
//! An uploaded image is identified by the SHA-256 of its bytes; the hex form
//! of that hash is the stable reference embedded in event records.

mod error;
mod image_ref;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use image_ref::ImageRef;
pub use traits::{BoxReader, ImageStore};
