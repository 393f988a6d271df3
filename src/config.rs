use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DoorwatchConfig {
    pub camera: CameraConfig,
    pub recognition: RecognitionConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub announcer: AnnouncerConfig,
    pub input: InputConfig,
    pub sync: SyncConfig,
    pub messages: MessagesConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Still resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Seconds to wait for a single still before giving up
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecognitionConfig {
    /// Base URL of the recognition service
    #[serde(default = "default_recognition_endpoint")]
    pub endpoint: String,

    /// Optional subscription key sent with each request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upper bound for a single identify call in milliseconds
    #[serde(default = "default_recognition_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Base directory holding the visitor folders
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Folder name of the whitelist collection
    #[serde(default = "default_whitelist_folder")]
    pub whitelist_folder: String,

    /// Folder name of the intruder collection
    #[serde(default = "default_intruder_folder")]
    pub intruder_folder: String,

    /// Folder name where fresh captures are staged
    #[serde(default = "default_capture_folder")]
    pub capture_folder: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AnnouncerConfig {
    /// Speech program (e.g. "espeak"); log-only when unset
    #[serde(default)]
    pub program: Option<String>,

    /// Extra arguments placed before the spoken text
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InputConfig {
    /// Listen on the terminal for the manual override key
    #[serde(default = "default_keyboard")]
    pub keyboard: bool,

    /// Input device the motion sensor is exposed as
    #[serde(default)]
    pub sensor_device: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Periodic directory refresh interval, 0 disables
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MessagesConfig {
    #[serde(default = "default_initial_greeting")]
    pub initial_greeting: String,

    #[serde(default = "default_motion_detected")]
    pub motion_detected: String,

    #[serde(default = "default_not_authorized")]
    pub not_authorized: String,

    #[serde(default = "default_no_camera")]
    pub no_camera: String,

    #[serde(default = "default_recognition_not_ready")]
    pub recognition_not_ready: String,

    #[serde(default = "default_capture_failed")]
    pub capture_failed: String,

    /// Greeting for a recognized visitor; `{name}` is replaced
    #[serde(default = "default_allowed_entry")]
    pub allowed_entry: String,
}

impl MessagesConfig {
    pub fn allowed_entry_for(&self, visitor_name: &str) -> String {
        self.allowed_entry.replace("{name}", visitor_name)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Entry attempt mailbox capacity
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

impl DoorwatchConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default(
                "camera.capture_timeout_seconds",
                default_capture_timeout(),
            )?
            .set_default("recognition.endpoint", default_recognition_endpoint())?
            .set_default("recognition.timeout_ms", default_recognition_timeout())?
            .set_default("storage.path", default_storage_path())?
            .set_default("storage.whitelist_folder", default_whitelist_folder())?
            .set_default("storage.intruder_folder", default_intruder_folder())?
            .set_default("storage.capture_folder", default_capture_folder())?
            .set_default("input.keyboard", default_keyboard())?
            .set_default(
                "sync.refresh_interval_seconds",
                default_refresh_interval(),
            )?
            .set_default("messages.initial_greeting", default_initial_greeting())?
            .set_default("messages.motion_detected", default_motion_detected())?
            .set_default("messages.not_authorized", default_not_authorized())?
            .set_default("messages.no_camera", default_no_camera())?
            .set_default(
                "messages.recognition_not_ready",
                default_recognition_not_ready(),
            )?
            .set_default("messages.capture_failed", default_capture_failed())?
            .set_default("messages.allowed_entry", default_allowed_entry())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("system.mailbox_capacity", default_mailbox_capacity() as i64)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment variables with DOORWATCH_ prefix, e.g. DOORWATCH_RECOGNITION__ENDPOINT
            .add_source(
                Environment::with_prefix("DOORWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: DoorwatchConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate camera settings
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.capture_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Camera capture_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        // Validate recognition settings
        if self.recognition.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Recognition timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !self.recognition.endpoint.starts_with("http://")
            && !self.recognition.endpoint.starts_with("https://")
        {
            return Err(ConfigError::Message(format!(
                "Recognition endpoint must be an http(s) URL, got '{}'",
                self.recognition.endpoint
            )));
        }

        // Validate storage layout
        let folders = [
            ("whitelist_folder", &self.storage.whitelist_folder),
            ("intruder_folder", &self.storage.intruder_folder),
            ("capture_folder", &self.storage.capture_folder),
        ];
        for (key, name) in folders {
            if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
                return Err(ConfigError::Message(format!(
                    "Storage {} must be a plain folder name, got '{}'",
                    key, name
                )));
            }
        }

        if self.storage.whitelist_folder == self.storage.intruder_folder
            || self.storage.whitelist_folder == self.storage.capture_folder
            || self.storage.intruder_folder == self.storage.capture_folder
        {
            return Err(ConfigError::Message(
                "Storage whitelist, intruder and capture folders must differ".to_string(),
            ));
        }

        // Validate messages
        if !self.messages.allowed_entry.contains("{name}") {
            return Err(ConfigError::Message(
                "messages.allowed_entry must contain a {name} placeholder".to_string(),
            ));
        }

        // Validate system settings
        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.system.mailbox_capacity == 0 {
            return Err(ConfigError::Message(
                "Mailbox capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for DoorwatchConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                capture_timeout_seconds: default_capture_timeout(),
            },
            recognition: RecognitionConfig {
                endpoint: default_recognition_endpoint(),
                api_key: None,
                timeout_ms: default_recognition_timeout(),
            },
            storage: StorageConfig {
                path: default_storage_path(),
                whitelist_folder: default_whitelist_folder(),
                intruder_folder: default_intruder_folder(),
                capture_folder: default_capture_folder(),
            },
            announcer: AnnouncerConfig::default(),
            input: InputConfig {
                keyboard: default_keyboard(),
                sensor_device: None,
            },
            sync: SyncConfig {
                refresh_interval_seconds: default_refresh_interval(),
            },
            messages: MessagesConfig {
                initial_greeting: default_initial_greeting(),
                motion_detected: default_motion_detected(),
                not_authorized: default_not_authorized(),
                no_camera: default_no_camera(),
                recognition_not_ready: default_recognition_not_ready(),
                capture_failed: default_capture_failed(),
                allowed_entry: default_allowed_entry(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                mailbox_capacity: default_mailbox_capacity(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_capture_timeout() -> u64 {
    5
}

fn default_recognition_endpoint() -> String {
    "http://127.0.0.1:8500".to_string()
}
fn default_recognition_timeout() -> u64 {
    10_000
}

fn default_storage_path() -> String {
    "./pictures".to_string()
}
fn default_whitelist_folder() -> String {
    "Dorm_Room_Monitor_Whitelist".to_string()
}
fn default_intruder_folder() -> String {
    "Dorm Room Monitor Intruders".to_string()
}
fn default_capture_folder() -> String {
    "Dorm Room Monitor Captures".to_string()
}

fn default_keyboard() -> bool {
    false
}

fn default_refresh_interval() -> u64 {
    0
}

fn default_initial_greeting() -> String {
    "Dorm room monitor has been activated.".to_string()
}
fn default_motion_detected() -> String {
    "Intruder detected.".to_string()
}
fn default_not_authorized() -> String {
    "Sorry! I don't recognize you. You are not authorized to be here.".to_string()
}
fn default_no_camera() -> String {
    "Sorry! It seems like your camera has not been fully initialized.".to_string()
}
fn default_recognition_not_ready() -> String {
    "Sorry! Facial recognition is still initializing.".to_string()
}
fn default_capture_failed() -> String {
    "Sorry! I was unable to take your picture.".to_string()
}
fn default_allowed_entry() -> String {
    "Hello {name}! You are authorized to be here.".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}
fn default_mailbox_capacity() -> usize {
    16
}
