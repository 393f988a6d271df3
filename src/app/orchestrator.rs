use super::types::{ComponentState, ShutdownReason};
use crate::announcer::{self, Announcer};
use crate::camera::{Camera, StillCameraBuilder};
use crate::config::DoorwatchConfig;
use crate::coordinator::{Collaborators, EntryCoordinator, EntryTrigger};
use crate::directory::{CollectionRoots, DirectorySync, VisitorDirectory};
use crate::error::Result;
use crate::events::EventBus;
use crate::input::{KeyboardInputHandler, MotionSensorHandler};
use crate::recognition::{HttpRecognitionBackend, RecognitionBackend, RecognitionGateway};
use crate::store::{LocalPhotoStore, PhotoStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Hardware and service adapters the orchestrator wires together
pub struct Components {
    pub store: Arc<dyn PhotoStore>,
    pub camera: Arc<dyn Camera>,
    pub recognition: Arc<dyn RecognitionBackend>,
    pub announcer: Arc<dyn Announcer>,
}

/// Owns every long-running part of the monitor and drives its lifecycle
pub struct DoorwatchOrchestrator {
    pub(super) config: DoorwatchConfig,
    pub(super) event_bus: Arc<EventBus>,

    // Components
    pub(super) store: Arc<dyn PhotoStore>,
    pub(super) camera: Arc<dyn Camera>,
    pub(super) recognition: Arc<dyn RecognitionBackend>,
    pub(super) announcer: Arc<dyn Announcer>,
    pub(super) sync: Arc<DirectorySync>,
    pub(super) coordinator: Arc<EntryCoordinator>,
    pub(super) trigger: Option<EntryTrigger>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,
    pub(super) sensor_handler: Option<MotionSensorHandler>,
    pub(super) tasks: Vec<(&'static str, JoinHandle<()>)>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl DoorwatchOrchestrator {
    /// Build the production adapters described by `config`
    pub async fn new(config: DoorwatchConfig) -> Result<Self> {
        let store: Arc<dyn PhotoStore> = Arc::new(LocalPhotoStore::new(&config.storage.path));

        let camera = StillCameraBuilder::new()
            .config(config.camera.clone())
            .store(Arc::clone(&store))
            .staging_folder(config.storage.capture_folder.clone())
            .build()
            .await?;

        let recognition = HttpRecognitionBackend::new(&config.recognition)?;
        recognition.initialize().await;

        let announcer = announcer::from_config(&config.announcer);

        let components = Components {
            store,
            camera: Arc::new(camera),
            recognition: Arc::new(recognition),
            announcer,
        };
        Ok(Self::with_components(config, components))
    }

    /// Wire the given adapters together
    pub fn with_components(config: DoorwatchConfig, components: Components) -> Self {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let sync = Arc::new(DirectorySync::new(
            Arc::clone(&components.store),
            Arc::new(VisitorDirectory::new()),
            CollectionRoots {
                whitelist: config.storage.whitelist_folder.clone(),
                intruders: config.storage.intruder_folder.clone(),
            },
            Arc::clone(&event_bus),
        ));

        let coordinator = Arc::new(EntryCoordinator::new(
            Collaborators {
                camera: Arc::clone(&components.camera),
                gateway: RecognitionGateway::new(
                    Arc::clone(&components.recognition),
                    Duration::from_millis(config.recognition.timeout_ms),
                ),
                announcer: Arc::clone(&components.announcer),
                store: Arc::clone(&components.store),
                sync: Arc::clone(&sync),
            },
            config.messages.clone(),
            Arc::clone(&event_bus),
        ));

        info!(
            "Doorwatch wired: whitelist '{}', intruders '{}' under {}",
            config.storage.whitelist_folder, config.storage.intruder_folder, config.storage.path
        );

        Self {
            keyboard_enabled: config.input.keyboard,
            config,
            event_bus,
            store: components.store,
            camera: components.camera,
            recognition: components.recognition,
            announcer: components.announcer,
            sync,
            coordinator,
            trigger: None,
            keyboard_handler: None,
            sensor_handler: None,
            tasks: Vec::new(),
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Current whitelist and intruder snapshots for presentation
    pub fn directory(&self) -> Arc<VisitorDirectory> {
        self.sync.directory()
    }

    /// Entry attempt channel, available once started
    pub fn trigger(&self) -> Option<EntryTrigger> {
        self.trigger.clone()
    }

    /// Ask `run` to return and shut the system down
    pub async fn request_shutdown(&self, reason: ShutdownReason) {
        if let Some(sender) = self.shutdown_sender.lock().await.take() {
            let _ = sender.send(reason);
        }
    }
}
