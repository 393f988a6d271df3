use super::*;
use crate::announcer::Announcer;
use crate::camera::StillCamera;
use crate::config::DoorwatchConfig;
use crate::coordinator::{EntryOutcome, NotReadyReason, TriggerSource};
use crate::error::{AnnounceError, BackendError};
use crate::events::DoorwatchEvent;
use crate::recognition::RecognitionBackend;
use crate::store::{CollisionPolicy, MemoryPhotoStore, PhotoStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::timeout;

#[derive(Default)]
struct RecordingAnnouncer {
    spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn speak(&self, text: &str) -> Result<(), AnnounceError> {
        self.spoken.lock().push(text.to_string());
        Ok(())
    }
}

struct ReadyBackend;

#[async_trait]
impl RecognitionBackend for ReadyBackend {
    async fn is_ready(&self) -> bool {
        true
    }

    async fn identify(&self, _image: &[u8]) -> Result<Vec<String>, BackendError> {
        Ok(vec![])
    }
}

fn create_orchestrator() -> (DoorwatchOrchestrator, Arc<MemoryPhotoStore>, Arc<RecordingAnnouncer>) {
    let config = DoorwatchConfig::default();
    let store = Arc::new(MemoryPhotoStore::new());
    let announcer = Arc::new(RecordingAnnouncer::default());

    // Never initialized, so the camera reports not ready
    let camera = StillCamera::new(
        config.camera.clone(),
        store.clone(),
        config.storage.capture_folder.clone(),
    );

    let orchestrator = DoorwatchOrchestrator::with_components(
        config,
        Components {
            store: store.clone(),
            camera: Arc::new(camera),
            recognition: Arc::new(ReadyBackend),
            announcer: announcer.clone(),
        },
    );
    (orchestrator, store, announcer)
}

#[tokio::test]
async fn test_component_state_management() {
    let (mut orchestrator, _store, _announcer) = create_orchestrator();
    assert!(orchestrator.get_all_component_states().await.is_empty());

    orchestrator.initialize().await.unwrap();
    assert_eq!(
        orchestrator.get_component_state("coordinator").await,
        Some(ComponentState::Stopped)
    );
    assert_eq!(orchestrator.get_component_state("keyboard").await, None);

    orchestrator
        .set_component_state("camera", ComponentState::Running)
        .await;
    assert_eq!(
        orchestrator.get_component_state("camera").await,
        Some(ComponentState::Running)
    );
}

#[tokio::test]
async fn test_start_opens_roots_greets_and_syncs() {
    let (mut orchestrator, store, announcer) = create_orchestrator();
    let config = DoorwatchConfig::default();

    let whitelist = store.open_root(&config.storage.whitelist_folder).await.unwrap();
    let alice = store
        .create_folder(&whitelist, "alice", CollisionPolicy::FailIfExists)
        .await
        .unwrap();
    store.write_file(&alice, "1.jpg", b"jpeg").await.unwrap();

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    assert_eq!(
        announcer.spoken.lock().first(),
        Some(&config.messages.initial_greeting)
    );
    assert_eq!(orchestrator.directory().whitelist().len(), 1);
    assert!(orchestrator.directory().intruders().is_empty());
    assert!(orchestrator.trigger().is_some());

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.get("storage"), Some(&ComponentState::Running));
    assert_eq!(states.get("camera"), Some(&ComponentState::Failed));
    assert_eq!(states.get("recognition"), Some(&ComponentState::Running));
    assert_eq!(states.get("coordinator"), Some(&ComponentState::Running));

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(
        orchestrator.get_component_state("coordinator").await,
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_entry_attempt_flows_through_coordinator() {
    let (mut orchestrator, _store, announcer) = create_orchestrator();
    let config = DoorwatchConfig::default();
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let mut events = orchestrator.event_bus().subscribe();
    let trigger = orchestrator.trigger().unwrap();
    assert!(trigger.signal(TriggerSource::ManualOverride));

    let outcome = timeout(Duration::from_secs(2), async {
        loop {
            if let DoorwatchEvent::EntryCompleted { outcome, .. } = events.recv().await.unwrap() {
                return outcome;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(
        outcome,
        EntryOutcome::DeniedSystemNotReady {
            reason: NotReadyReason::Camera
        }
    );
    assert_eq!(
        *announcer.spoken.lock(),
        vec![
            config.messages.initial_greeting.clone(),
            config.messages.motion_detected.clone(),
            config.messages.no_camera.clone(),
        ]
    );

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_run_returns_after_shutdown_request() {
    let (mut orchestrator, _store, _announcer) = create_orchestrator();
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    orchestrator
        .request_shutdown(ShutdownReason::UserRequest)
        .await;
    let exit_code = timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 0);
}

#[tokio::test]
async fn test_shutdown_requested_event_stops_run() {
    let (mut orchestrator, _store, _announcer) = create_orchestrator();
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let event_bus = orchestrator.event_bus();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = event_bus.publish(DoorwatchEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "User requested via keyboard".to_string(),
        });
    });

    let exit_code = timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 0);
    assert!(orchestrator.trigger().is_none());
}
