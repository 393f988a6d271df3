use super::{ComponentState, DoorwatchOrchestrator};
use crate::coordinator::CoordinatorActor;
use crate::directory::DirectorySync;
use crate::error::Result;
use crate::input::{KeyboardInputHandler, MotionSensorHandler};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

impl DoorwatchOrchestrator {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing Doorwatch components");

        // Set initial component states
        let mut states = self.component_states.lock().await;
        for component in ["storage", "camera", "recognition", "directory", "coordinator"] {
            states.insert(component.to_string(), ComponentState::Stopped);
        }
        if self.config.input.sensor_device.is_some() {
            states.insert("sensor".to_string(), ComponentState::Stopped);
        }
        // Only register keyboard component if enabled
        if self.keyboard_enabled {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }
        drop(states);

        Ok(())
    }

    /// Bring the monitor up: storage, readiness checks, greeting, sync, coordinator, inputs
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Doorwatch");

        // Open the collection roots first; nothing works without them
        self.set_component_state("storage", ComponentState::Starting)
            .await;
        for root in [
            &self.config.storage.whitelist_folder,
            &self.config.storage.intruder_folder,
            &self.config.storage.capture_folder,
        ] {
            if let Err(e) = self.store.open_root(root).await {
                error!("Failed to open storage folder '{}': {}", root, e);
                self.set_component_state("storage", ComponentState::Failed)
                    .await;
                return Err(e.into());
            }
        }
        self.set_component_state("storage", ComponentState::Running)
            .await;

        // Readiness is re-checked on every entry attempt, so neither blocks startup
        if self.camera.is_ready().await {
            self.set_component_state("camera", ComponentState::Running)
                .await;
        } else {
            warn!("Camera is not ready; entry attempts will be refused until it is");
            self.set_component_state("camera", ComponentState::Failed)
                .await;
        }

        if self.recognition.is_ready().await {
            self.set_component_state("recognition", ComponentState::Running)
                .await;
        } else {
            warn!("Recognition backend is not ready yet");
            self.set_component_state("recognition", ComponentState::Starting)
                .await;
        }

        // Greet once the announcer is up
        if let Err(e) = self
            .announcer
            .speak(&self.config.messages.initial_greeting)
            .await
        {
            warn!("Startup greeting failed: {}", e);
        }

        // Initial sync of both collections
        self.set_component_state("directory", ComponentState::Starting)
            .await;
        let whitelist = self.sync.refresh_whitelist().await;
        let intruders = self.sync.refresh_intruders().await;
        info!("Initial sync: whitelist {:?}, intruders {:?}", whitelist, intruders);

        // Periodic refresh, 0 disables it
        let interval = self.config.sync.refresh_interval_seconds;
        if interval > 0 {
            let handle = tokio::spawn(periodic_refresh(
                Arc::clone(&self.sync),
                Duration::from_secs(interval),
                self.cancellation_token.child_token(),
            ));
            self.tasks.push(("directory", handle));
        }
        self.set_component_state("directory", ComponentState::Running)
            .await;

        // Start the coordinator actor; inputs feed its trigger
        let (trigger, handle) = CoordinatorActor::spawn(
            Arc::clone(&self.coordinator),
            self.config.system.mailbox_capacity,
            self.cancellation_token.child_token(),
        );
        self.tasks.push(("coordinator", handle));
        self.trigger = Some(trigger.clone());
        self.set_component_state("coordinator", ComponentState::Running)
            .await;

        // Start motion sensor if configured
        if let Some(device) = self.config.input.sensor_device.clone() {
            self.set_component_state("sensor", ComponentState::Starting)
                .await;
            let sensor = MotionSensorHandler::new(device, trigger.clone(), Arc::clone(&self.event_bus));
            match sensor.start().await {
                Ok(()) => {
                    self.set_component_state("sensor", ComponentState::Running)
                        .await;
                    self.sensor_handler = Some(sensor);
                }
                Err(e) => {
                    // Manual override still works without the sensor
                    warn!("Motion sensor unavailable: {}", e);
                    self.set_component_state("sensor", ComponentState::Failed)
                        .await;
                }
            }
        }

        // Start keyboard input handler (only if enabled)
        if self.keyboard_enabled {
            self.set_component_state("keyboard", ComponentState::Starting)
                .await;
            let keyboard = KeyboardInputHandler::new(trigger, Arc::clone(&self.event_bus));
            keyboard.start().await.map_err(|e| {
                error!("Failed to start keyboard input: {}", e);
                e
            })?;
            self.keyboard_handler = Some(keyboard);
            self.set_component_state("keyboard", ComponentState::Running)
                .await;
        }

        info!("Doorwatch started");
        Ok(())
    }
}

async fn periodic_refresh(sync: Arc<DirectorySync>, every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately and the initial sync already ran
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                sync.refresh_whitelist().await;
                sync.refresh_intruders().await;
            }
        }
    }
}
