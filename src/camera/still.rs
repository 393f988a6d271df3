use super::{stage_capture, Camera, CapturedImage};
use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::store::PhotoStore;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer::prelude::*;

/// V4L2 camera that grabs one JPEG still per request through GStreamer
pub struct StillCamera {
    config: CameraConfig,
    store: Arc<dyn PhotoStore>,
    staging_folder: String,
    ready: AtomicBool,
}

impl StillCamera {
    pub fn new(config: CameraConfig, store: Arc<dyn PhotoStore>, staging_folder: String) -> Self {
        Self {
            config,
            store,
            staging_folder,
            ready: AtomicBool::new(false),
        }
    }

    fn device_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/video{}", self.config.index))
    }

    fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.config.capture_timeout_seconds)
    }

    /// Initialize GStreamer and check that the device exists.
    ///
    /// Failure leaves the camera not ready; the entry coordinator reports it
    /// on each attempt instead of the process refusing to start.
    #[cfg(all(feature = "camera", target_os = "linux"))]
    pub async fn initialize(&self) -> bool {
        if let Err(e) = gstreamer::init() {
            warn!("Failed to initialize GStreamer: {}", e);
            self.ready.store(false, Ordering::Release);
            return false;
        }

        let device = self.device_path();
        let present = tokio::fs::try_exists(&device).await.unwrap_or(false);
        if present {
            info!(
                "Camera {} ready for {}x{} stills",
                device.display(),
                self.config.resolution.0,
                self.config.resolution.1
            );
        } else {
            warn!("Camera device {} not found", device.display());
        }

        self.ready.store(present, Ordering::Release);
        present
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    pub async fn initialize(&self) -> bool {
        warn!(
            "Still capture for {} requires the camera feature on Linux",
            self.device_path().display()
        );
        self.ready.store(false, Ordering::Release);
        false
    }

    #[cfg(all(feature = "camera", target_os = "linux"))]
    fn build_pipeline_string(&self) -> String {
        let (width, height) = self.config.resolution;
        format!(
            "v4l2src device={} num-buffers=1 ! \
             image/jpeg,width={},height={} ! \
             appsink name=sink sync=false max-buffers=1 emit-signals=false",
            self.device_path().display(),
            width,
            height
        )
    }

    /// Run a one-shot pipeline and return the JPEG payload of its only sample
    #[cfg(all(feature = "camera", target_os = "linux"))]
    fn grab_jpeg(pipeline_desc: &str, timeout: Duration) -> Result<Vec<u8>, CaptureError> {
        let pipeline = gstreamer::parse::launch(pipeline_desc)
            .map_err(|e| CaptureError::Pipeline {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| CaptureError::Pipeline {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CaptureError::Pipeline {
                details: "Pipeline has no appsink".to_string(),
            })?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| CaptureError::Pipeline {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            // Elements may already be READY or PAUSED
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(CaptureError::Pipeline {
                details: format!("Failed to start pipeline: {}", e),
            });
        }

        let sample = appsink.try_pull_sample(gstreamer::ClockTime::from_mseconds(
            timeout.as_millis() as u64,
        ));
        let _ = pipeline.set_state(gstreamer::State::Null);

        let sample = sample.ok_or(CaptureError::Timeout {
            seconds: timeout.as_secs(),
        })?;
        let buffer = sample.buffer().ok_or(CaptureError::EmptyFrame)?;
        let map = buffer.map_readable().map_err(|e| CaptureError::Pipeline {
            details: format!("Failed to map buffer: {}", e),
        })?;

        if map.is_empty() {
            return Err(CaptureError::EmptyFrame);
        }
        Ok(map.as_slice().to_vec())
    }

    #[cfg(all(feature = "camera", target_os = "linux"))]
    async fn capture_jpeg(&self) -> Result<Vec<u8>, CaptureError> {
        let pipeline_desc = self.build_pipeline_string();
        let timeout = self.capture_timeout();
        debug!("Capturing still with pipeline: {}", pipeline_desc);

        tokio::task::spawn_blocking(move || Self::grab_jpeg(&pipeline_desc, timeout))
            .await
            .map_err(|e| CaptureError::Pipeline {
                details: format!("Capture task failed: {}", e),
            })?
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    async fn capture_jpeg(&self) -> Result<Vec<u8>, CaptureError> {
        debug!(
            "No capture backend compiled in, {} within {:?} unavailable",
            self.device_path().display(),
            self.capture_timeout()
        );
        Err(CaptureError::NotInitialized)
    }
}

#[async_trait]
impl Camera for StillCamera {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn capture_photo(&self) -> Result<CapturedImage, CaptureError> {
        if !self.ready.load(Ordering::Acquire) {
            return Err(CaptureError::NotInitialized);
        }

        let data = self.capture_jpeg().await?;
        let image = stage_capture(self.store.as_ref(), &self.staging_folder, data).await?;

        info!("Captured still {} ({} bytes)", image.file, image.data.len());
        Ok(image)
    }
}
