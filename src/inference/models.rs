//! Wire models for the local inference endpoint

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Successful generation result.
///
/// Only `response` is required of the endpoint; everything else defaults when
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: String,
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Structured overview the image-analysis instruction asks the model to emit.
///
/// Parsing the JSON-within-text is a front-end concern; the memory core stores
/// the raw response untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub num_images: usize,
    pub overall_description: String,
    #[serde(default)]
    pub images: Vec<ImageReport>,
}

/// Per-image breakdown within an [`ImageAnalysis`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReport {
    pub main_subject: String,
    #[serde(default)]
    pub colors: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub notable_elements: Vec<String>,
}

impl ImageAnalysis {
    /// Decode an analysis overview from the raw response text
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
