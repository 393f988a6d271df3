mod http;

pub use http::HttpRecognitionBackend;

use crate::error::{BackendError, RecognitionError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Face identification service
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    async fn is_ready(&self) -> bool;

    /// Names of the whitelisted visitors matching the face in `image`, in backend order
    async fn identify(&self, image: &[u8]) -> Result<Vec<String>, BackendError>;
}

/// Bounds every backend call and classifies its failures.
///
/// Callers only ever see [`RecognitionError::NoFaceDetected`] or
/// [`RecognitionError::BackendFailure`].
pub struct RecognitionGateway {
    backend: Arc<dyn RecognitionBackend>,
    timeout: Duration,
}

impl RecognitionGateway {
    pub fn new(backend: Arc<dyn RecognitionBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn is_ready(&self) -> bool {
        self.backend.is_ready().await
    }

    pub async fn identify(&self, image: &[u8]) -> Result<Vec<String>, RecognitionError> {
        let result = match tokio::time::timeout(self.timeout, self.backend.identify(image)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Recognition call timed out after {:?}", self.timeout);
                return Err(RecognitionError::BackendFailure(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        match result {
            Ok(matches) => {
                debug!("Recognition returned {} match(es)", matches.len());
                Ok(matches)
            }
            Err(e) => Err(classify(e)),
        }
    }
}

fn classify(error: BackendError) -> RecognitionError {
    match error {
        BackendError::NoFaceDetected => RecognitionError::NoFaceDetected,
        other => RecognitionError::BackendFailure(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct ScriptedBackend {
        ready: bool,
        delay: Duration,
        response: Mutex<Option<Result<Vec<String>, BackendError>>>,
    }

    impl ScriptedBackend {
        fn new(response: Result<Vec<String>, BackendError>) -> Self {
            Self {
                ready: true,
                delay: Duration::ZERO,
                response: Mutex::new(Some(response)),
            }
        }
    }

    #[async_trait]
    impl RecognitionBackend for ScriptedBackend {
        async fn is_ready(&self) -> bool {
            self.ready
        }

        async fn identify(&self, _image: &[u8]) -> Result<Vec<String>, BackendError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response
                .lock()
                .take()
                .unwrap_or_else(|| Err(BackendError::Transport("exhausted".to_string())))
        }
    }

    fn gateway(backend: ScriptedBackend) -> RecognitionGateway {
        RecognitionGateway::new(Arc::new(backend), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_matches_keep_backend_order() {
        let gateway = gateway(ScriptedBackend::new(Ok(vec![
            "bob".to_string(),
            "alice".to_string(),
        ])));
        assert_eq!(gateway.identify(b"jpeg").await.unwrap(), vec!["bob", "alice"]);
    }

    #[tokio::test]
    async fn test_no_face_is_classified() {
        let gateway = gateway(ScriptedBackend::new(Err(BackendError::NoFaceDetected)));
        assert_eq!(
            gateway.identify(b"jpeg").await,
            Err(RecognitionError::NoFaceDetected)
        );
    }

    #[tokio::test]
    async fn test_other_failures_become_backend_failure() {
        let failures = vec![
            BackendError::Transport("connection refused".to_string()),
            BackendError::Malformed("expected value".to_string()),
            BackendError::Rejected {
                status: 400,
                message: "whitelist is empty".to_string(),
            },
        ];

        for failure in failures {
            let gateway = gateway(ScriptedBackend::new(Err(failure)));
            assert!(matches!(
                gateway.identify(b"jpeg").await,
                Err(RecognitionError::BackendFailure(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let mut backend = ScriptedBackend::new(Ok(vec!["alice".to_string()]));
        backend.delay = Duration::from_secs(5);
        let gateway = gateway(backend);

        let result = gateway.identify(b"jpeg").await;
        assert!(matches!(result, Err(RecognitionError::BackendFailure(msg)) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_readiness_is_delegated() {
        let mut backend = ScriptedBackend::new(Ok(vec![]));
        backend.ready = false;
        assert!(!gateway(backend).is_ready().await);
    }
}
