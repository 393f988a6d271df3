use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an entry attempt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    /// Motion sensor rising edge
    Sensor,
    /// Manual override control
    ManualOverride,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::Sensor => write!(f, "sensor"),
            TriggerSource::ManualOverride => write!(f, "manual override"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotReadyReason {
    Camera,
    Recognition,
    CaptureFailed,
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::Camera => write!(f, "camera not ready"),
            NotReadyReason::Recognition => write!(f, "recognition not ready"),
            NotReadyReason::CaptureFailed => write!(f, "capture failed"),
        }
    }
}

/// Result of one entry cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryOutcome {
    /// First match returned by the recognition backend
    Granted { name: String },
    /// Nobody matched; `intruder` is the recorded folder name when persistence succeeded
    DeniedNoMatch { intruder: Option<String> },
    DeniedNoFace,
    DeniedSystemNotReady { reason: NotReadyReason },
    /// Recognition failed for a reason other than a missing face
    Inconclusive { error: String },
}

impl fmt::Display for EntryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryOutcome::Granted { name } => write!(f, "granted to {}", name),
            EntryOutcome::DeniedNoMatch {
                intruder: Some(name),
            } => write!(f, "denied, recorded as {}", name),
            EntryOutcome::DeniedNoMatch { intruder: None } => {
                write!(f, "denied, intruder not recorded")
            }
            EntryOutcome::DeniedNoFace => write!(f, "denied, no face detected"),
            EntryOutcome::DeniedSystemNotReady { reason } => write!(f, "denied, {}", reason),
            EntryOutcome::Inconclusive { error } => write!(f, "inconclusive: {}", error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Processing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        let granted = EntryOutcome::Granted {
            name: "alice".to_string(),
        };
        assert_eq!(granted.to_string(), "granted to alice");

        let not_ready = EntryOutcome::DeniedSystemNotReady {
            reason: NotReadyReason::Camera,
        };
        assert_eq!(not_ready.to_string(), "denied, camera not ready");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = EntryOutcome::DeniedNoMatch {
            intruder: Some("intruder3".to_string()),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let back: EntryOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
