use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::image_ref::ImageRef;
use super::traits::{BoxReader, ImageStore};

/// Filesystem-backed image store.
///
/// Images live at `{base_path}/{2 hex chars}/{remaining 62 hex chars}`.
/// Writes go to `{base_path}/.tmp` first and are renamed into place, so a
/// reader never observes a partially written image.
pub struct FilesystemImageStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemImageStore {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn image_path(&self, image: &ImageRef) -> PathBuf {
        self.base_path.join(image.shard()).join(image.file_name())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ImageStore for FilesystemImageStore {
    async fn put(&self, data: &[u8]) -> Result<ImageRef, StorageError> {
        if data.is_empty() {
            return Err(StorageError::Empty);
        }
        let size = data.len() as u64;
        if size > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: size,
                limit: self.max_size,
            });
        }

        let image = ImageRef::compute(data);
        let target = self.image_path(&image);
        if fs::try_exists(&target).await? {
            return Ok(image);
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(image)
    }

    async fn open(&self, image: &ImageRef) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.image_path(image)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(image.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, image: &ImageRef) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.image_path(image)).await?)
    }

    async fn delete(&self, image: &ImageRef) -> Result<bool, StorageError> {
        match fs::remove_file(self.image_path(image)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
