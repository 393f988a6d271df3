use super::Announcer;
use crate::error::AnnounceError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Speaks by running an external program such as `espeak` with the text as last argument
#[derive(Debug, Clone)]
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
}

impl CommandAnnouncer {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

#[async_trait]
impl Announcer for CommandAnnouncer {
    async fn speak(&self, text: &str) -> Result<(), AnnounceError> {
        debug!("Speaking via {}: {}", self.program, text);

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| AnnounceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(AnnounceError::Exit {
                status: status.to_string(),
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command() {
        let announcer = CommandAnnouncer::new("true".to_string(), vec![]);
        assert!(announcer.speak("hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_command_reports_exit() {
        let announcer = CommandAnnouncer::new("false".to_string(), vec![]);
        assert!(matches!(
            announcer.speak("hello").await,
            Err(AnnounceError::Exit { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_program_reports_spawn_failure() {
        let announcer = CommandAnnouncer::new("doorwatch-no-such-speaker".to_string(), vec![]);
        assert!(matches!(
            announcer.speak("hello").await,
            Err(AnnounceError::Spawn { .. })
        ));
    }
}
