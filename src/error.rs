//! Crate-level error type

use crate::inference::InferenceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors surfaced by the conversation layer
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("inference request failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("image encoding failed: {0}")]
    Image(String),

    #[error("session error: {0}")]
    Session(String),
}
