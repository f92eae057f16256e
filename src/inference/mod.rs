//! Inference client boundary
//!
//! The conversation layer only ever sees the [`InferenceClient`] trait; the
//! concrete [`OllamaClient`] owns the wire protocol, timeout, and retry
//! policy for a locally hosted endpoint.

pub mod client;
pub mod config;
pub mod models;

pub use client::{InferenceClient, InferenceError, OllamaClient};
pub use config::InferenceConfig;
pub use models::{GenerateRequest, GenerateResponse, ImageAnalysis, ImageReport};
