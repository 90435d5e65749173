use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::errors::{FaceSearchResult, SearchError};
use crate::types::Embedding;

const SERVICE_NAME: &str = "embedding";

/// Configuration for the face-embedding service client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 30_000, // embedding extraction is model-bound, allow 30s
        }
    }
}

/// Connection status for the embedding service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Failed { error: String },
}

/// Health check response from the embedding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceHealth {
    pub status: String,
    pub model: Option<String>,
}

/// Connection state information shared across concurrent callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub last_check: Option<chrono::DateTime<chrono::Utc>>,
    pub last_successful_connection: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            last_check: None,
            last_successful_connection: None,
        }
    }
}

/// Successful response from `POST /extract-embedding`
#[derive(Debug, Deserialize)]
struct ExtractResponse {
    embedding: Vec<f32>,
    #[allow(dead_code)]
    faces_detected: Option<usize>,
    #[allow(dead_code)]
    model_name: Option<String>,
}

/// Error body returned by the embedding service on 4xx/5xx
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: Option<String>,
}

/// Client for the external face-embedding extractor
///
/// Turns raw image bytes into a fixed-dimension float vector. A 400 response
/// whose detail reports a missing face becomes `NoFaceDetected`; every other
/// transport or non-success outcome becomes `UpstreamUnavailable`.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    config: EmbeddingConfig,
    client: Client,
    state: Arc<RwLock<ConnectionState>>,
}

impl Default for EmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingClient {
    /// Create a client with default configuration
    pub fn new() -> Self {
        Self::with_config(EmbeddingConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: EmbeddingConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config,
            client,
            state: Arc::new(RwLock::new(ConnectionState::default())),
        }
    }

    /// Get current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Get configuration
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Extract a face embedding from raw image bytes
    ///
    /// The caller has already stripped any data-URI prefix and base64
    /// decoding; this takes the actual image bytes.
    pub async fn extract(&self, image_bytes: Vec<u8>) -> FaceSearchResult<Embedding> {
        let start = Instant::now();
        let url = format!("{}/extract-embedding", self.config.base_url);

        let part = Part::bytes(image_bytes)
            .file_name("face.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| SearchError::upstream(SERVICE_NAME, e.to_string()))?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let error = SearchError::upstream(
                    SERVICE_NAME,
                    format!("request failed: {}", e),
                );
                log::warn!("embedding extraction transport failure: {}", e);
                error
            })?;

        let status = response.status();
        if status.is_success() {
            let body: ExtractResponse = response.json().await.map_err(|e| {
                SearchError::upstream(SERVICE_NAME, format!("malformed response: {}", e))
            })?;

            {
                let mut state = self.state.write().await;
                state.status = ConnectionStatus::Connected;
                state.last_check = Some(chrono::Utc::now());
                state.last_successful_connection = Some(chrono::Utc::now());
            }

            log::debug!(
                "embedding extracted: dim={} elapsed={:?}",
                body.embedding.len(),
                start.elapsed()
            );
            return Ok(body.embedding);
        }

        // The extractor signals an undetectable face as a 400 with a
        // human-readable detail; treat only that shape as NoFaceDetected.
        let detail = response
            .json::<ErrorDetail>()
            .await
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_default();

        if status.as_u16() == 400 && detail.to_lowercase().contains("no face") {
            log::debug!("embedding service reported no detectable face");
            return Err(SearchError::NoFaceDetected);
        }

        self.record_failure(&format!("HTTP {}: {}", status, detail)).await;
        Err(SearchError::upstream(
            SERVICE_NAME,
            format!("HTTP {}: {}", status.as_u16(), detail),
        ))
    }

    /// Perform a health check against the embedding service
    pub async fn check_health(&self) -> FaceSearchResult<EmbeddingServiceHealth> {
        let url = format!("{}/health", self.config.base_url);

        {
            let mut state = self.state.write().await;
            state.last_check = Some(chrono::Utc::now());
        }

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health = response
                    .json::<EmbeddingServiceHealth>()
                    .await
                    .unwrap_or(EmbeddingServiceHealth {
                        status: "healthy".to_string(),
                        model: None,
                    });

                let mut state = self.state.write().await;
                state.status = ConnectionStatus::Connected;
                state.last_successful_connection = Some(chrono::Utc::now());

                Ok(health)
            }
            Ok(response) => {
                let message = format!("HTTP {}", response.status().as_u16());
                self.record_failure(&message).await;
                Err(SearchError::upstream(SERVICE_NAME, message))
            }
            Err(e) => {
                let message = format!("connection failed: {}", e);
                self.record_failure(&message).await;
                Err(SearchError::upstream(SERVICE_NAME, message))
            }
        }
    }

    /// Check if the service is available (lightweight version)
    pub async fn is_available(&self) -> bool {
        self.check_health().await.is_ok()
    }

    async fn record_failure(&self, message: &str) {
        log::warn!("embedding service failure: {}", message);
        let mut state = self.state.write().await;
        state.status = ConnectionStatus::Failed {
            error: message.to_string(),
        };
    }
}
