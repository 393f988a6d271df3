use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoorwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl DoorwatchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, S: Into<String>>(component: C, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures of the persistent photo store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Folder not found: {path}")]
    FolderNotFound { path: String },

    #[error("Folder already exists: {path}")]
    AlreadyExists { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Storage IO failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of a still capture on a ready camera
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera not initialized")]
    NotInitialized,

    #[error("Camera pipeline error: {details}")]
    Pipeline { details: String },

    #[error("Capture timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Captured frame is empty")]
    EmptyFrame,

    #[error("Failed to stage captured image: {0}")]
    Staging(#[from] StorageError),
}

/// Raw failure reported by a recognition backend before classification
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("No face detected in image")]
    NoFaceDetected,

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Malformed backend response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Malformed(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// Classified recognition failure as seen by the entry coordinator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("No face detected")]
    NoFaceDetected,

    #[error("Recognition backend failure: {0}")]
    BackendFailure(String),
}

/// Failures of the speech/announcement output
#[derive(Error, Debug)]
pub enum AnnounceError {
    #[error("Failed to start speech command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Speech command exited with status {status}")]
    Exit { status: String },
}

pub type Result<T> = std::result::Result<T, DoorwatchError>;
