use super::still::StillCamera;
use crate::config::CameraConfig;
use crate::error::{DoorwatchError, Result};
use crate::store::PhotoStore;
use std::sync::Arc;

/// Builder for the still camera
pub struct StillCameraBuilder {
    config: Option<CameraConfig>,
    store: Option<Arc<dyn PhotoStore>>,
    staging_folder: Option<String>,
}

impl StillCameraBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            staging_folder: None,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn store(mut self, store: Arc<dyn PhotoStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn staging_folder(mut self, name: impl Into<String>) -> Self {
        self.staging_folder = Some(name.into());
        self
    }

    /// Build and initialize the camera; an unavailable device still yields a camera that reports not ready
    pub async fn build(self) -> Result<StillCamera> {
        let config = self
            .config
            .ok_or_else(|| DoorwatchError::system("Camera configuration must be specified"))?;
        let store = self
            .store
            .ok_or_else(|| DoorwatchError::system("Camera needs a photo store for staging"))?;
        let staging_folder = self
            .staging_folder
            .ok_or_else(|| DoorwatchError::system("Camera staging folder must be specified"))?;

        let camera = StillCamera::new(config, store, staging_folder);
        camera.initialize().await;
        Ok(camera)
    }
}

impl Default for StillCameraBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_requires_config() {
        let result = StillCameraBuilder::new()
            .staging_folder("captures")
            .build()
            .await;
        assert!(matches!(result, Err(DoorwatchError::System { .. })));
    }
}
