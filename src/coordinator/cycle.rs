use super::types::{CoordinatorState, EntryOutcome, NotReadyReason, TriggerSource};
use crate::announcer::Announcer;
use crate::camera::{Camera, CapturedImage};
use crate::config::MessagesConfig;
use crate::directory::{DirectorySync, IntruderRecorder, RefreshOutcome};
use crate::error::RecognitionError;
use crate::events::{DoorwatchEvent, EventBus};
use crate::gate::{Gate, OwnedGatePass};
use crate::recognition::RecognitionGateway;
use crate::store::PhotoStore;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

/// Everything an entry cycle talks to
pub struct Collaborators {
    pub camera: Arc<dyn Camera>,
    pub gateway: RecognitionGateway,
    pub announcer: Arc<dyn Announcer>,
    pub store: Arc<dyn PhotoStore>,
    pub sync: Arc<DirectorySync>,
}

/// Runs entry cycles one at a time.
///
/// A cycle can only start from `Idle`; the gate pass taken by [`begin`]
/// returns the coordinator to `Idle` when the cycle ends, whichever way it ends.
///
/// [`begin`]: EntryCoordinator::begin
pub struct EntryCoordinator {
    camera: Arc<dyn Camera>,
    gateway: RecognitionGateway,
    announcer: Arc<dyn Announcer>,
    store: Arc<dyn PhotoStore>,
    recorder: IntruderRecorder,
    sync: Arc<DirectorySync>,
    messages: MessagesConfig,
    event_bus: Arc<EventBus>,
    gate: Arc<Gate>,
}

impl EntryCoordinator {
    pub fn new(parts: Collaborators, messages: MessagesConfig, event_bus: Arc<EventBus>) -> Self {
        let recorder = IntruderRecorder::new(
            Arc::clone(&parts.store),
            parts.sync.roots().intruders.clone(),
        );

        Self {
            camera: parts.camera,
            gateway: parts.gateway,
            announcer: parts.announcer,
            store: parts.store,
            recorder,
            sync: parts.sync,
            messages,
            event_bus,
            gate: Arc::new(Gate::new()),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        if self.gate.is_busy() {
            CoordinatorState::Processing
        } else {
            CoordinatorState::Idle
        }
    }

    /// Move to `Processing`, or `None` if a cycle is already in flight
    pub fn begin(&self) -> Option<OwnedGatePass> {
        self.gate.try_enter_owned()
    }

    /// Run a full cycle for `source` unless one is already running
    pub async fn handle_attempt(&self, source: TriggerSource) -> Option<EntryOutcome> {
        match self.begin() {
            Some(pass) => Some(self.run_cycle(source, pass).await),
            None => {
                debug!("Entry attempt from {} dropped, cycle in progress", source);
                None
            }
        }
    }

    /// Run one cycle; `pass` is held until the cycle is over
    pub async fn run_cycle(&self, source: TriggerSource, pass: OwnedGatePass) -> EntryOutcome {
        let _pass = pass;
        info!("Entry attempt from {}", source);
        let _ = self.event_bus.publish(DoorwatchEvent::EntryAttempted {
            source,
            timestamp: SystemTime::now(),
        });

        let outcome = self.process().await;

        let _ = self.event_bus.publish(DoorwatchEvent::EntryCompleted {
            outcome: outcome.clone(),
            timestamp: SystemTime::now(),
        });
        outcome
    }

    async fn process(&self) -> EntryOutcome {
        self.announce(&self.messages.motion_detected).await;

        if !self.camera.is_ready().await {
            warn!("Camera not ready, skipping entry attempt");
            self.announce(&self.messages.no_camera).await;
            return EntryOutcome::DeniedSystemNotReady {
                reason: NotReadyReason::Camera,
            };
        }

        if !self.gateway.is_ready().await {
            warn!("Recognition backend not ready, skipping entry attempt");
            self.announce(&self.messages.recognition_not_ready).await;
            return EntryOutcome::DeniedSystemNotReady {
                reason: NotReadyReason::Recognition,
            };
        }

        let image = match self.camera.capture_photo().await {
            Ok(image) => image,
            Err(e) => {
                warn!("Capture failed: {}", e);
                self.announce(&self.messages.capture_failed).await;
                return EntryOutcome::DeniedSystemNotReady {
                    reason: NotReadyReason::CaptureFailed,
                };
            }
        };

        match self.gateway.identify(&image.data).await {
            Ok(matches) => match matches.into_iter().next() {
                Some(name) => {
                    info!("Recognized {}", name);
                    self.announce(&self.messages.allowed_entry_for(&name)).await;
                    self.discard(&image).await;
                    EntryOutcome::Granted { name }
                }
                None => self.deny(&image).await,
            },
            Err(RecognitionError::NoFaceDetected) => {
                info!("No face detected in {}", image.file);
                self.discard(&image).await;
                EntryOutcome::DeniedNoFace
            }
            Err(RecognitionError::BackendFailure(e)) => {
                warn!("Recognition failed: {}", e);
                self.discard(&image).await;
                EntryOutcome::Inconclusive { error: e }
            }
        }
    }

    async fn deny(&self, image: &CapturedImage) -> EntryOutcome {
        self.announce(&self.messages.not_authorized).await;

        let record = match self.recorder.record(&image.file).await {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to record intruder: {}", e);
                let _ = self.event_bus.publish(DoorwatchEvent::SystemError {
                    component: "entry_coordinator".to_string(),
                    error: format!("Failed to record intruder: {}", e),
                });
                return EntryOutcome::DeniedNoMatch { intruder: None };
            }
        };

        let _ = self.event_bus.publish(DoorwatchEvent::IntruderRecorded {
            name: record.name.clone(),
            timestamp: SystemTime::now(),
        });

        if let RefreshOutcome::AlreadyRefreshing = self.sync.refresh_intruders().await {
            debug!("Intruder refresh already running, {} picked up by the next one", record.name);
        }

        EntryOutcome::DeniedNoMatch {
            intruder: Some(record.name),
        }
    }

    /// Drop a staged capture that is not kept as an intruder photo
    async fn discard(&self, image: &CapturedImage) {
        if let Err(e) = self.store.remove_file(&image.file).await {
            warn!("Failed to remove staged capture {}: {}", image.file, e);
        }
    }

    async fn announce(&self, text: &str) {
        if let Err(e) = self.announcer.speak(text).await {
            warn!("Announcement failed: {}", e);
        }
    }
}
