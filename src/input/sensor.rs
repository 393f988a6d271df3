use crate::coordinator::EntryTrigger;
use crate::error::{DoorwatchError, Result};
use crate::events::EventBus;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(all(feature = "sensor", target_os = "linux"))]
use {
    crate::coordinator::TriggerSource,
    crate::events::DoorwatchEvent,
    evdev::{Device, EventType, InputEvent, InputEventKind},
    tokio::time::sleep,
    tracing::{debug, error, warn},
};

/// PIR motion sensor exposed as a Linux input device (`gpio-keys` overlay).
///
/// Every key press (value 1) on the device is the sensor's rising edge and
/// becomes an entry attempt; releases and repeats are ignored.
#[cfg_attr(not(all(feature = "sensor", target_os = "linux")), allow(dead_code))]
pub struct MotionSensorHandler {
    device_path: String,
    trigger: EntryTrigger,
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
    max_retries: u32,
    retry_delay: Duration,
}

impl MotionSensorHandler {
    pub fn new(device_path: impl Into<String>, trigger: EntryTrigger, event_bus: Arc<EventBus>) -> Self {
        Self {
            device_path: device_path.into(),
            trigger,
            event_bus,
            cancellation_token: CancellationToken::new(),
            max_retries: 10,
            retry_delay: Duration::from_secs(5),
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Start monitoring the sensor in the background, reconnecting on failure
    #[cfg(all(feature = "sensor", target_os = "linux"))]
    pub async fn start(&self) -> Result<()> {
        info!("Starting motion sensor on {}", self.device_path);

        let device_path = self.device_path.clone();
        let trigger = self.trigger.clone();
        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();
        let max_retries = self.max_retries;
        let retry_delay = self.retry_delay;

        tokio::spawn(async move {
            let mut retry_count = 0;

            loop {
                match Self::monitor_device(&device_path, &trigger, &cancellation_token).await {
                    Ok(()) => {
                        info!("Motion sensor monitoring ended");
                        break;
                    }
                    Err(e) => {
                        error!("Motion sensor error: {}", e);
                        retry_count += 1;

                        let _ = event_bus.publish(DoorwatchEvent::SystemError {
                            component: "motion_sensor".to_string(),
                            error: format!("Attempt {}/{}: {}", retry_count, max_retries, e),
                        });

                        if retry_count >= max_retries {
                            error!("Motion sensor failed after {} attempts, giving up", max_retries);
                            break;
                        }

                        let delay = retry_delay * 2_u32.pow(retry_count.min(5));
                        warn!(
                            "Retrying motion sensor in {:?} (attempt {}/{})",
                            delay, retry_count, max_retries
                        );
                        tokio::select! {
                            _ = cancellation_token.cancelled() => break,
                            _ = sleep(delay) => {}
                        }
                    }
                }
            }
        });

        Ok(())
    }

    #[cfg(not(all(feature = "sensor", target_os = "linux")))]
    pub async fn start(&self) -> Result<()> {
        Err(DoorwatchError::component(
            "motion_sensor",
            format!(
                "{} cannot be read: motion sensor support requires the sensor feature on Linux",
                self.device_path
            ),
        ))
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping motion sensor");
        self.cancellation_token.cancel();
        Ok(())
    }

    #[cfg(all(feature = "sensor", target_os = "linux"))]
    async fn monitor_device(
        device_path: &str,
        trigger: &EntryTrigger,
        cancellation_token: &CancellationToken,
    ) -> Result<()> {
        let device = Device::open(device_path).map_err(|e| {
            let details = match e.kind() {
                std::io::ErrorKind::NotFound => format!("{} not found", device_path),
                std::io::ErrorKind::PermissionDenied => {
                    format!("permission denied opening {}", device_path)
                }
                _ => format!("failed to open {}: {}", device_path, e),
            };
            DoorwatchError::component("motion_sensor", details)
        })?;

        if !device.supported_events().contains(EventType::KEY) {
            return Err(DoorwatchError::component(
                "motion_sensor",
                format!("{} does not report key events", device_path),
            ));
        }

        info!(
            "Motion sensor opened: {} ({})",
            device_path,
            device.name().unwrap_or("Unknown")
        );

        let mut events = device.into_event_stream().map_err(|e| {
            DoorwatchError::component("motion_sensor", format!("Failed to stream events: {}", e))
        })?;

        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 5;

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => return Ok(()),
                event = events.next_event() => match event {
                    Ok(event) => {
                        consecutive_errors = 0;
                        if is_motion_event(&event) {
                            debug!("Motion sensed: {:?}", event);
                            trigger.signal(TriggerSource::Sensor);
                        }
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            return Err(DoorwatchError::component(
                                "motion_sensor",
                                format!("Too many consecutive read errors: {}", e),
                            ));
                        }
                        warn!("Error reading motion sensor (attempt {}): {}", consecutive_errors, e);
                        sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }
    }
}

/// Rising edge of the sensor line
#[cfg(all(feature = "sensor", target_os = "linux"))]
pub(crate) fn is_motion_event(event: &InputEvent) -> bool {
    matches!(event.kind(), InputEventKind::Key(_)) && event.value() == 1
}
