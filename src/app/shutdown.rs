use super::{ComponentState, DoorwatchOrchestrator};
use crate::error::{DoorwatchError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl DoorwatchOrchestrator {
    /// Stop inputs first, then the background tasks; in-flight cycles are abandoned
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let mut exit_code = 0;

        if let Some(keyboard) = self.keyboard_handler.take() {
            if self
                .stop_component("keyboard", Duration::from_secs(2), keyboard.stop())
                .await
                .is_err()
            {
                exit_code = 1;
            }
        }

        if let Some(sensor) = self.sensor_handler.take() {
            if self
                .stop_component("sensor", Duration::from_secs(2), sensor.stop())
                .await
                .is_err()
            {
                exit_code = 1;
            }
        }

        self.trigger = None;
        self.cancellation_token.cancel();

        for (component, handle) in std::mem::take(&mut self.tasks) {
            let joined = async move {
                handle.await.map_err(|e| {
                    DoorwatchError::component(component, format!("task ended abnormally: {}", e))
                })
            };
            if self
                .stop_component(component, Duration::from_secs(5), joined)
                .await
                .is_err()
            {
                exit_code = 1;
            }
        }

        for component in ["storage", "camera", "recognition", "directory"] {
            self.set_component_state(component, ComponentState::Stopped)
                .await;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_component<F>(&self, component: &str, limit: Duration, stop: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        let result = match timeout(limit, stop).await {
            Ok(result) => result,
            Err(_) => Err(DoorwatchError::system(format!(
                "{} component stop timeout",
                component
            ))),
        };

        match &result {
            Ok(()) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
            }
            Err(e) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("Error stopping {} component: {}", component, e);
            }
        }
        result
    }
}
