mod builder;
mod still;

pub use builder::StillCameraBuilder;
pub use still::StillCamera;

use crate::error::{CaptureError, StorageError};
use crate::store::{FileRef, PhotoStore};
use async_trait::async_trait;
use std::time::SystemTime;
use uuid::Uuid;

/// A still image that has been written to the capture staging folder
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub data: Vec<u8>,
    pub file: FileRef,
    pub captured_at: SystemTime,
}

/// Camera able to take a single still on demand
#[async_trait]
pub trait Camera: Send + Sync {
    async fn is_ready(&self) -> bool;

    async fn capture_photo(&self) -> Result<CapturedImage, CaptureError>;
}

/// Write a freshly captured JPEG into the staging folder under a unique name
pub async fn stage_capture(
    store: &dyn PhotoStore,
    staging_folder: &str,
    data: Vec<u8>,
) -> Result<CapturedImage, StorageError> {
    let folder = store.open_root(staging_folder).await?;
    let name = format!("capture_{}.jpg", Uuid::new_v4().simple());
    let file = store.write_file(&folder, &name, &data).await?;

    Ok(CapturedImage {
        data,
        file,
        captured_at: SystemTime::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPhotoStore;

    #[tokio::test]
    async fn test_stage_capture_writes_unique_files() {
        let store = MemoryPhotoStore::new();

        let first = stage_capture(&store, "captures", vec![1, 2, 3]).await.unwrap();
        let second = stage_capture(&store, "captures", vec![4]).await.unwrap();

        assert_ne!(first.file, second.file);
        assert!(first.file.name().starts_with("capture_"));
        assert!(first.file.name().ends_with(".jpg"));
        assert_eq!(store.read_file(&first.file), Some(vec![1, 2, 3]));
    }
}
