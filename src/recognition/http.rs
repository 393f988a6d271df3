use super::RecognitionBackend;
use crate::config::RecognitionConfig;
use crate::error::{BackendError, DoorwatchError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const NO_FACE_CODE: &str = "no_face_detected";

#[derive(Debug, Deserialize)]
struct IdentifyResponse {
    #[serde(default)]
    matches: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Recognition service reached over HTTP.
///
/// `POST <endpoint>/identify` takes the still as a multipart `image` part and
/// answers `{"matches": [...]}`. Readiness is probed at `<endpoint>/healthz`.
pub struct HttpRecognitionBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    ready: AtomicBool,
}

impl HttpRecognitionBackend {
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                DoorwatchError::component("recognition", format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            ready: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Probe the service once and remember the result
    pub async fn initialize(&self) -> bool {
        let healthy = self.health_check().await;
        if healthy {
            info!("Recognition service at {} is ready", self.endpoint);
        } else {
            warn!("Recognition service at {} is not reachable yet", self.endpoint);
        }
        self.ready.store(healthy, Ordering::Release);
        healthy
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/healthz", self.endpoint);
        match self.with_key(self.client.get(&url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Health probe failed: {}", e);
                false
            }
        }
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

#[async_trait]
impl RecognitionBackend for HttpRecognitionBackend {
    async fn is_ready(&self) -> bool {
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        // Service may have come up since startup
        self.initialize().await
    }

    async fn identify(&self, image: &[u8]) -> std::result::Result<Vec<String>, BackendError> {
        let url = format!("{}/identify", self.endpoint);
        let part = Part::bytes(image.to_vec())
            .file_name("capture.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("image", part);

        let resp = self.with_key(self.client.post(&url)).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        parse_identify_response(status, &body)
    }
}

fn parse_identify_response(
    status: StatusCode,
    body: &str,
) -> std::result::Result<Vec<String>, BackendError> {
    if status.is_success() {
        let parsed: IdentifyResponse =
            serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;
        return Ok(parsed.matches);
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(error) if error.code == NO_FACE_CODE => Err(BackendError::NoFaceDetected),
        Ok(error) => Err(BackendError::Rejected {
            status: status.as_u16(),
            message: if error.message.is_empty() {
                error.code
            } else {
                error.message
            },
        }),
        Err(_) => Err(BackendError::Rejected {
            status: status.as_u16(),
            message: body.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matches() {
        let matches =
            parse_identify_response(StatusCode::OK, r#"{"matches":["alice","bob"]}"#).unwrap();
        assert_eq!(matches, vec!["alice", "bob"]);

        let empty = parse_identify_response(StatusCode::OK, r#"{"matches":[]}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_no_face() {
        let result = parse_identify_response(
            StatusCode::BAD_REQUEST,
            r#"{"code":"no_face_detected","message":"No face in image"}"#,
        );
        assert!(matches!(result, Err(BackendError::NoFaceDetected)));
    }

    #[test]
    fn test_parse_rejection_and_garbage() {
        let rejected = parse_identify_response(
            StatusCode::CONFLICT,
            r#"{"code":"empty_whitelist","message":"No visitors trained"}"#,
        );
        assert!(matches!(
            rejected,
            Err(BackendError::Rejected { status: 409, ref message }) if message == "No visitors trained"
        ));

        let garbage = parse_identify_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(garbage, Err(BackendError::Rejected { status: 502, .. })));

        let malformed = parse_identify_response(StatusCode::OK, "not json");
        assert!(matches!(malformed, Err(BackendError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_not_ready() {
        let config = RecognitionConfig {
            endpoint: "http://127.0.0.1:9/".to_string(),
            api_key: Some("secret".to_string()),
            timeout_ms: 500,
        };
        let backend = HttpRecognitionBackend::new(&config).unwrap();

        assert_eq!(backend.endpoint(), "http://127.0.0.1:9");
        assert!(!backend.is_ready().await);
        assert!(matches!(
            backend.identify(b"jpeg").await,
            Err(BackendError::Transport(_))
        ));
    }
}
