//! Inference client for a locally hosted multimodal endpoint
//!
//! The endpoint speaks the Ollama generate protocol: one synchronous
//! `POST /api/generate` per prompt, optionally carrying base64-encoded
//! images, answering with a JSON body whose `response` field holds the text.

use super::config::InferenceConfig;
use super::models::{GenerateRequest, GenerateResponse};
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Inference error types
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// External collaborator boundary: one blocking generation call per prompt.
///
/// Endpoint address, model selection, timeout, and retry policy all live
/// behind this trait; callers only see text in, text or failure out.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Generate a completion for `prompt`, forwarding `images` when non-empty
    async fn generate(
        &self,
        prompt: &str,
        images: &[String],
    ) -> Result<GenerateResponse, InferenceError>;
}

/// Reqwest-backed client for an Ollama-style endpoint
pub struct OllamaClient {
    http: Client,
    config: InferenceConfig,
}

impl OllamaClient {
    /// Create a new client
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| InferenceError::RequestFailed(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Create with default configuration plus environment overrides
    pub fn from_env() -> Result<Self, InferenceError> {
        Self::new(InferenceConfig::default().from_env())
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    async fn call_generate_api(
        &self,
        prompt: &str,
        images: &[String],
    ) -> Result<GenerateResponse, InferenceError> {
        let url = format!("{}/api/generate", self.config.url);

        let request_body = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: if self.config.format.is_empty() {
                None
            } else {
                Some(self.config.format.clone())
            },
            images: if images.is_empty() {
                None
            } else {
                Some(images.to_vec())
            },
        };

        debug!(
            model = %self.config.model,
            images = images.len(),
            "sending request to model for prompt evaluation"
        );

        let response = self
            .http
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout(e.to_string())
                } else {
                    InferenceError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InferenceError::UpstreamError(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        Ok(generate_response)
    }

    /// Calculate exponential backoff
    fn calculate_backoff(&self, attempt: usize) -> Duration {
        let base = self.config.retry_backoff();
        let multiplier = 2_u32.pow((attempt - 1) as u32);
        base.saturating_mul(multiplier)
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        images: &[String],
    ) -> Result<GenerateResponse, InferenceError> {
        let start = Instant::now();

        // Retry with exponential backoff
        let mut attempt = 0;
        let result = loop {
            attempt += 1;

            match self.call_generate_api(prompt, images).await {
                Ok(response) => {
                    METRICS.record_inference(true);
                    break response;
                }
                Err(e) => {
                    METRICS.record_inference(false);

                    if attempt > self.config.retry_attempts {
                        error!("Generation failed after {} attempts: {}", attempt, e);
                        METRICS
                            .inference_request_duration
                            .observe(start.elapsed().as_secs_f64());
                        return Err(e);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "Generation attempt {} failed: {}, retrying in {:?}",
                        attempt, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        };

        METRICS
            .inference_request_duration
            .observe(start.elapsed().as_secs_f64());

        Ok(result)
    }
}
