//! Configuration for the local inference endpoint

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inference client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the inference endpoint
    #[serde(default = "default_url")]
    pub url: String,

    /// Model name passed on every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Response format requested from the endpoint; empty disables the field
    #[serde(default = "default_format")]
    pub format: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of retry attempts after the first failure
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    /// Base backoff in milliseconds, doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

// Default value functions
fn default_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "minicpm-v:latest".to_string()
}
fn default_format() -> String {
    "json".to_string()
}
fn default_timeout_ms() -> u64 {
    120_000
}
fn default_retry_attempts() -> usize {
    2
}
fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            format: default_format(),
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl InferenceConfig {
    /// Override fields from environment variables where present
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("OLLAMA_URL") {
            self.url = val;
        }

        if let Ok(val) = std::env::var("OLLAMA_MODEL") {
            self.model = val;
        }

        if let Ok(val) = std::env::var("OLLAMA_FORMAT") {
            self.format = val;
        }

        if let Ok(val) = std::env::var("OLLAMA_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.timeout_ms = timeout;
            }
        }

        if let Ok(val) = std::env::var("OLLAMA_RETRY_ATTEMPTS") {
            if let Ok(retries) = val.parse() {
                self.retry_attempts = retries;
            }
        }

        if let Ok(val) = std::env::var("OLLAMA_RETRY_BACKOFF_MS") {
            if let Ok(ms) = val.parse() {
                self.retry_backoff_ms = ms;
            }
        }

        self
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
