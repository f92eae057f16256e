//! Layered configuration
//!
//! Defaults < optional TOML file < `CHAT_MEMORY__*` environment variables.
//! A `.env` file is honored before the environment source is read.

use crate::error::{ChatError, Result};
use crate::inference::InferenceConfig;
use crate::memory::MemoryConfig;
use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// With no explicit path, a `chat-memory.toml` next to the working
    /// directory is used when present. Environment variables use the
    /// `CHAT_MEMORY` prefix with `__` separating sections, e.g.
    /// `CHAT_MEMORY__MEMORY__BUDGET=8000`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();

        builder = match path {
            Some(p) => builder.add_source(config::File::with_name(p)),
            None => builder.add_source(config::File::with_name("chat-memory").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("CHAT_MEMORY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()
            .map_err(|e| ChatError::Configuration(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ChatError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate that the configuration is consistent
    pub fn validate(&self) -> Result<()> {
        self.memory.validate()?;

        if self.inference.url.is_empty() {
            return Err(ChatError::Configuration(
                "inference url must not be empty".to_string(),
            ));
        }

        if self.inference.timeout_ms == 0 {
            return Err(ChatError::Configuration(
                "inference timeout must be at least 1ms".to_string(),
            ));
        }

        Ok(())
    }
}
