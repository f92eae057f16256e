//! Bounded conversation memory
//!
//! The store keeps an ordered history of conversation turns plus an optional
//! data-story anchor and enforces a word-count budget by FIFO eviction of the
//! oldest non-anchor entry.

pub mod entry;
pub mod sizer;
pub mod store;

pub use entry::{ContextEntry, EntryId};
pub use sizer::{SizerKind, TextSizer, TiktokenSizer, WordCountSizer};
pub use store::{MemoryConfig, MemoryStore, ANCHOR_PREFIX};
