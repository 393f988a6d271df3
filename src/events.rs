use crate::coordinator::{EntryOutcome, TriggerSource};
use crate::directory::Collection;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("No active subscribers")]
    NoSubscribers,

    #[error("Receiver lagged behind by {0} events")]
    Lagged(u64),

    #[error("Event channel closed")]
    ChannelClosed,
}

/// Events that can occur in the doorwatch system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DoorwatchEvent {
    /// An entry attempt was accepted and a cycle started
    EntryAttempted {
        source: TriggerSource,
        timestamp: SystemTime,
    },
    /// An entry cycle finished
    EntryCompleted {
        outcome: EntryOutcome,
        timestamp: SystemTime,
    },
    /// A new intruder folder was written to the store
    IntruderRecorded { name: String, timestamp: SystemTime },
    /// A directory collection was rebuilt from the store
    DirectoryRefreshed {
        collection: Collection,
        count: usize,
        timestamp: SystemTime,
    },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl DoorwatchEvent {
    pub fn description(&self) -> String {
        match self {
            DoorwatchEvent::EntryAttempted { source, .. } => {
                format!("Entry attempt from {}", source)
            }
            DoorwatchEvent::EntryCompleted { outcome, .. } => {
                format!("Entry cycle completed: {}", outcome)
            }
            DoorwatchEvent::IntruderRecorded { name, .. } => {
                format!("Intruder recorded as {}", name)
            }
            DoorwatchEvent::DirectoryRefreshed {
                collection, count, ..
            } => {
                format!("{} refreshed ({} visitors)", collection, count)
            }
            DoorwatchEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            DoorwatchEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DoorwatchEvent::EntryAttempted { .. } => "entry_attempted",
            DoorwatchEvent::EntryCompleted { .. } => "entry_completed",
            DoorwatchEvent::IntruderRecorded { .. } => "intruder_recorded",
            DoorwatchEvent::DirectoryRefreshed { .. } => "directory_refreshed",
            DoorwatchEvent::SystemError { .. } => "system_error",
            DoorwatchEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<DoorwatchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DoorwatchEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers, returning how many received it
    pub fn publish(&self, event: DoorwatchEvent) -> Result<usize, EventBusError> {
        match &event {
            DoorwatchEvent::EntryCompleted { outcome, .. } => {
                info!("Entry cycle completed: {}", outcome);
            }
            DoorwatchEvent::IntruderRecorded { name, .. } => {
                warn!("Intruder recorded as {}", name);
            }
            DoorwatchEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            DoorwatchEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|_| EventBusError::NoSubscribers)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Receiver that only yields events of the given types
pub struct EventReceiver {
    receiver: broadcast::Receiver<DoorwatchEvent>,
    event_types: Vec<&'static str>,
}

impl EventReceiver {
    pub fn new(receiver: broadcast::Receiver<DoorwatchEvent>, event_types: Vec<&'static str>) -> Self {
        Self {
            receiver,
            event_types,
        }
    }

    pub async fn recv(&mut self) -> Result<DoorwatchEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.event_types.is_empty() || self.event_types.contains(&event.event_type())
                    {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event receiver lagged behind by {} events", n);
                    return Err(EventBusError::Lagged(n));
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
