//! Context entry model

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stable identity for a context entry.
///
/// Assigned by the store in insertion order and never reused, so tag
/// associations and external references survive eviction of earlier entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub(crate) u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// One immutable unit of conversational history.
///
/// `text` already carries its role prefix ("You: ", "Model: ", or the anchor
/// prefix) — the store never re-labels entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: EntryId,
    pub text: String,
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub tags: HashSet<String>,
}

impl ContextEntry {
    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }
}
