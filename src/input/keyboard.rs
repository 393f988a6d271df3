use crate::coordinator::{EntryTrigger, TriggerSource};
use crate::error::Result;
use crate::events::{DoorwatchEvent, EventBus};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    ManualOverride,
    Quit,
}

pub(crate) fn key_action(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Char(' ') => Some(KeyAction::ManualOverride),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Terminal keys: SPACE is the manual override button, `q`/ESC quits
pub struct KeyboardInputHandler {
    trigger: EntryTrigger,
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(trigger: EntryTrigger, event_bus: Arc<EventBus>) -> Self {
        Self {
            trigger,
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input - press SPACE for manual override, q to quit");

        let trigger = self.trigger.clone();
        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match key_action(key_event.code) {
                            Some(KeyAction::ManualOverride) => {
                                info!("Manual override pressed");
                                trigger.signal(TriggerSource::ManualOverride);
                            }
                            Some(KeyAction::Quit) => {
                                info!("Quit key pressed - requesting shutdown");
                                let _ = event_bus.publish(DoorwatchEvent::ShutdownRequested {
                                    timestamp: SystemTime::now(),
                                    reason: "User requested via keyboard".to_string(),
                                });
                                break;
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Keyboard input task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input");
        self.cancellation_token.cancel();

        // The poll loop notices cancellation within one poll interval
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(key_action(KeyCode::Char(' ')), Some(KeyAction::ManualOverride));
        assert_eq!(key_action(KeyCode::Char('q')), Some(KeyAction::Quit));
        assert_eq!(key_action(KeyCode::Esc), Some(KeyAction::Quit));
        assert_eq!(key_action(KeyCode::Enter), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let event_bus = Arc::new(EventBus::new(16));
        let (trigger, _mailbox) = EntryTrigger::channel(4);
        let handler = KeyboardInputHandler::new(trigger, event_bus);

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}
