use super::{DoorwatchOrchestrator, ShutdownReason};
use crate::error::{DoorwatchError, Result};
use crate::events::{DoorwatchEvent, EventBusError, EventReceiver};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

type ShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl DoorwatchOrchestrator {
    /// Run until a signal, a quit key or `request_shutdown`, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("Doorwatch is running");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| DoorwatchError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers();
        self.listen_for_shutdown_events();

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| DoorwatchError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Doorwatch shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self) {
        #[cfg(unix)]
        {
            let sender = Arc::clone(&self.shutdown_sender);
            let cancel = self.cancellation_token.clone();
            tokio::spawn(async move {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(sigterm) => sigterm,
                        Err(e) => {
                            error!("Failed to register SIGTERM handler: {}", e);
                            return;
                        }
                    };
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        send_shutdown(&sender, ShutdownReason::Signal("SIGTERM".to_string())).await;
                    }
                }
            });
        }

        let sender = Arc::clone(&self.shutdown_sender);
        let cancel = self.cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                Ok(()) = signal::ctrl_c() => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    send_shutdown(&sender, ShutdownReason::Signal("SIGINT".to_string())).await;
                }
            }
        });
    }

    /// Turn `ShutdownRequested` events (e.g. the quit key) into a shutdown
    fn listen_for_shutdown_events(&self) {
        let sender = Arc::clone(&self.shutdown_sender);
        let cancel = self.cancellation_token.clone();
        let mut events =
            EventReceiver::new(self.event_bus.subscribe(), vec!["shutdown_requested"]);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(DoorwatchEvent::ShutdownRequested { reason, .. }) => {
                            info!("Shutdown requested over event bus: {}", reason);
                            send_shutdown(&sender, ShutdownReason::UserRequest).await;
                            break;
                        }
                        Ok(_) | Err(EventBusError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
            }
        });
    }
}

async fn send_shutdown(sender: &ShutdownSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().await.take() {
        let _ = sender.send(reason);
    }
}
