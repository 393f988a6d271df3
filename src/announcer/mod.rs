mod command;

pub use command::CommandAnnouncer;

use crate::config::AnnouncerConfig;
use crate::error::AnnounceError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Speech output; resolves once the text has been spoken
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), AnnounceError>;
}

/// Announcer that only writes to the log
#[derive(Debug, Default)]
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    async fn speak(&self, text: &str) -> Result<(), AnnounceError> {
        info!(announcement = %text, "Announcing");
        Ok(())
    }
}

/// Pick the announcer described by the configuration
pub fn from_config(config: &AnnouncerConfig) -> Arc<dyn Announcer> {
    match &config.program {
        Some(program) if !program.trim().is_empty() => {
            info!("Announcements spoken through '{}'", program);
            Arc::new(CommandAnnouncer::new(program.clone(), config.args.clone()))
        }
        _ => {
            info!("No speech program configured, announcements are logged only");
            Arc::new(LogAnnouncer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_announcer_never_fails() {
        assert!(LogAnnouncer.speak("Intruder detected.").await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_program_falls_back_to_log() {
        let config = AnnouncerConfig {
            program: Some("  ".to_string()),
            args: vec![],
        };
        assert!(from_config(&config).speak("hello").await.is_ok());
    }
}
