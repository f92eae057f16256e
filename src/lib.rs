//! Bounded conversation memory and multimodal inference client
//!
//! The crate keeps a running conversation coherent against a locally hosted
//! multimodal model without unbounded context growth: turns accumulate in a
//! budget-bounded [`memory::MemoryStore`] (oldest non-anchor entries evicted
//! first), an optional image-derived "data story" anchor stays pinned, and
//! the [`driver::ConversationDriver`] renders the surviving context into each
//! prompt sent through the [`inference::InferenceClient`] boundary.

pub mod config;
pub mod driver;
pub mod error;
pub mod images;
pub mod inference;
pub mod logging;
pub mod memory;
pub mod metrics;

pub mod prelude {
    pub use crate::config::{Config, LoggingConfig};
    pub use crate::driver::{ConversationDriver, DriverState, Role, TranscriptTurn, TurnOutcome};
    pub use crate::error::{ChatError, Result};
    pub use crate::inference::{
        GenerateResponse, ImageAnalysis, InferenceClient, InferenceConfig, InferenceError,
        OllamaClient,
    };
    pub use crate::memory::{
        ContextEntry, EntryId, MemoryConfig, MemoryStore, SizerKind, TextSizer, ANCHOR_PREFIX,
    };
}
