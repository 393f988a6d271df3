pub mod announcer;
pub mod app;
pub mod camera;
pub mod config;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod events;
pub mod gate;
pub mod input;
pub mod recognition;
pub mod store;

pub use announcer::{Announcer, CommandAnnouncer, LogAnnouncer};
pub use app::{ComponentState, Components, DoorwatchOrchestrator, ShutdownReason};
pub use camera::{Camera, CapturedImage, StillCamera, StillCameraBuilder};
pub use config::DoorwatchConfig;
pub use coordinator::{
    Collaborators, CoordinatorActor, CoordinatorState, EntryCoordinator, EntryOutcome,
    EntryTrigger, NotReadyReason, TriggerSource,
};
pub use directory::{
    Collection, CollectionRoots, DirectorySync, IntruderRecord, IntruderRecorder, RefreshOutcome,
    Snapshot, Visitor, VisitorDirectory,
};
pub use error::{DoorwatchError, RecognitionError, Result, StorageError};
pub use events::{DoorwatchEvent, EventBus, EventReceiver};
pub use input::{KeyboardInputHandler, MotionSensorHandler};
pub use recognition::{HttpRecognitionBackend, RecognitionBackend, RecognitionGateway};
pub use store::{
    CollisionPolicy, FileRef, FolderRef, LocalPhotoStore, MemoryPhotoStore, PhotoStore,
};
