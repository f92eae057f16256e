//! Text size measurement for budget enforcement

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Size-of-text function used by the store to enforce its budget.
///
/// The contractual default measures whitespace-delimited words as an
/// approximation of tokenizer cost; eviction logic never changes when the
/// measure does.
pub trait TextSizer: Send + Sync {
    /// Measure the size of the given text in budget units
    fn size(&self, text: &str) -> usize;
}

/// Which sizer a store should be built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizerKind {
    Words,
    Tiktoken,
}

impl Default for SizerKind {
    fn default() -> Self {
        Self::Words
    }
}

/// Whitespace word count. Never matched against any real model tokenizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountSizer;

impl TextSizer for WordCountSizer {
    fn size(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Tiktoken-based sizer using cl100k_base, for callers that want budgets in
/// real token units.
pub struct TiktokenSizer {
    bpe: Arc<CoreBPE>,
}

impl TiktokenSizer {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bpe = cl100k_base()?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TextSizer for TiktokenSizer {
    fn size(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}
