use super::cycle::EntryCoordinator;
use super::types::TriggerSource;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sending side of the coordinator mailbox, shared by every input
#[derive(Debug, Clone)]
pub struct EntryTrigger {
    sender: mpsc::Sender<TriggerSource>,
}

impl EntryTrigger {
    /// Mailbox of the given capacity and its sending side
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TriggerSource>) {
        let (sender, mailbox) = mpsc::channel(capacity.max(1));
        (Self { sender }, mailbox)
    }

    /// Deliver an entry attempt without waiting; false if it could not be queued
    pub fn signal(&self, source: TriggerSource) -> bool {
        match self.sender.try_send(source) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Mailbox full, entry attempt from {} dropped", source);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Coordinator stopped, entry attempt from {} dropped", source);
                false
            }
        }
    }

    /// Signals queued but not yet taken by the actor
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Drains the mailbox and starts a cycle for each signal that finds the coordinator idle
pub struct CoordinatorActor {
    coordinator: Arc<EntryCoordinator>,
    mailbox: mpsc::Receiver<TriggerSource>,
    cancellation: CancellationToken,
}

impl CoordinatorActor {
    pub fn spawn(
        coordinator: Arc<EntryCoordinator>,
        capacity: usize,
        cancellation: CancellationToken,
    ) -> (EntryTrigger, JoinHandle<()>) {
        let (trigger, mailbox) = EntryTrigger::channel(capacity);
        let actor = Self {
            coordinator,
            mailbox,
            cancellation,
        };
        let handle = tokio::spawn(actor.run());
        (trigger, handle)
    }

    async fn run(mut self) {
        info!("Entry coordinator listening for entry attempts");

        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    info!("Entry coordinator shutting down");
                    break;
                }
                signal = self.mailbox.recv() => match signal {
                    Some(source) => self.dispatch(source),
                    None => {
                        debug!("All entry triggers dropped");
                        break;
                    }
                }
            }
        }
    }

    fn dispatch(&self, source: TriggerSource) {
        let Some(pass) = self.coordinator.begin() else {
            debug!("Entry attempt from {} dropped, cycle in progress", source);
            return;
        };

        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            coordinator.run_cycle(source, pass).await;
        });
    }
}
