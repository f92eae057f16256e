//! Bounded conversation memory store
//!
//! Accumulates conversation turns plus an optional "data story" anchor and
//! enforces a size budget by evicting the oldest non-anchor entry. The budget
//! is measured by a pluggable [`TextSizer`]; the default counts
//! whitespace-delimited words as an approximation of tokenizer cost.

use super::entry::{ContextEntry, EntryId};
use super::sizer::{SizerKind, TextSizer, TiktokenSizer, WordCountSizer};
use crate::error::{ChatError, Result};
use crate::metrics::METRICS;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix applied to the data-story anchor entry
pub const ANCHOR_PREFIX: &str = "Initial Image Data Story: ";

/// Memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Ceiling on total memory size, in sizer units (words by default)
    #[serde(default = "default_budget")]
    pub budget: usize,

    /// Which size function the store measures entries with
    #[serde(default)]
    pub sizer: SizerKind,
}

fn default_budget() -> usize {
    12000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            sizer: SizerKind::default(),
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.budget == 0 {
            return Err(ChatError::Configuration(
                "memory budget must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

struct Slot {
    entry: ContextEntry,
    size: usize,
}

/// Ordered, budget-bounded collection of context entries.
///
/// Entries keep strict insertion order; eviction removes the oldest non-anchor
/// entry and never reorders survivors. Once an anchor is set it occupies
/// position 0 and is only ever kept as the last surviving entry — if it alone
/// exceeds the budget, the overshoot is tolerated rather than evicting it.
///
/// One store per conversation session; nothing is persisted.
pub struct MemoryStore {
    slots: Vec<Slot>,
    budget: usize,
    anchor: Option<EntryId>,
    next_id: u64,
    total: usize,
    sizer: Arc<dyn TextSizer>,
}

impl MemoryStore {
    /// Create a store with the given budget, measured in whitespace words
    pub fn new(budget: usize) -> Self {
        Self::with_sizer(budget, Arc::new(WordCountSizer))
    }

    /// Create a store with a custom size function
    pub fn with_sizer(budget: usize, sizer: Arc<dyn TextSizer>) -> Self {
        Self {
            slots: Vec::new(),
            budget,
            anchor: None,
            next_id: 0,
            total: 0,
            sizer,
        }
    }

    /// Create a store from configuration
    pub fn from_config(config: &MemoryConfig) -> Result<Self> {
        config.validate()?;
        let sizer: Arc<dyn TextSizer> = match config.sizer {
            SizerKind::Words => Arc::new(WordCountSizer),
            SizerKind::Tiktoken => Arc::new(
                TiktokenSizer::new()
                    .map_err(|e| ChatError::Configuration(e.to_string()))?,
            ),
        };
        Ok(Self::with_sizer(config.budget, sizer))
    }

    /// Install the data-story anchor at position 0.
    ///
    /// The story is formatted with [`ANCHOR_PREFIX`] and participates in the
    /// same budget accounting as any other entry. Calling this again replaces
    /// the anchor text in place; the anchor slot keeps its identity.
    pub fn set_anchor(&mut self, story: &str) -> EntryId {
        let text = format!("{}{}", ANCHOR_PREFIX, story);
        let size = self.sizer.size(&text);

        let id = match self.anchor {
            Some(id) => {
                let slot = &mut self.slots[0];
                self.total = self.total - slot.size + size;
                slot.entry.text = text;
                slot.size = size;
                id
            }
            None => {
                let id = self.allocate_id();
                self.slots.insert(
                    0,
                    Slot {
                        entry: ContextEntry {
                            id,
                            text,
                            tags: HashSet::new(),
                        },
                        size,
                    },
                );
                self.total += size;
                self.anchor = Some(id);
                id
            }
        };

        debug!(anchor = %id, words = size, "anchor installed");
        self.enforce_budget();
        id
    }

    /// Append an untagged entry and enforce the budget
    pub fn add_entry(&mut self, text: impl Into<String>) -> EntryId {
        self.push(text.into(), HashSet::new())
    }

    /// Append an entry carrying tags and enforce the budget.
    ///
    /// Tags live on the entry itself, so eviction drops them atomically with
    /// it — no positional index to re-key.
    pub fn add_entry_with_tags(
        &mut self,
        text: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
    ) -> EntryId {
        self.push(text.into(), tags.into_iter().collect())
    }

    fn push(&mut self, text: String, tags: HashSet<String>) -> EntryId {
        // Empty text is accepted: it contributes 0 to the word count and is
        // still stored.
        let id = self.allocate_id();
        let size = self.sizer.size(&text);
        self.slots.push(Slot {
            entry: ContextEntry { id, text, tags },
            size,
        });
        self.total += size;
        self.enforce_budget();
        id
    }

    /// Total size across all entries under the configured sizer.
    ///
    /// With the default sizer this is the whitespace word count — an
    /// approximation of tokenizer cost, never matched against a real model
    /// tokenizer.
    pub fn word_count(&self) -> usize {
        self.total
    }

    /// Reconstitute the full surviving context as a single newline-joined
    /// string, oldest entry first. Always reflects the post-eviction state.
    pub fn render(&self) -> String {
        self.slots
            .iter()
            .map(|s| s.entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True while the store is in the residual state where the single
    /// surviving entry alone exceeds the budget
    pub fn over_budget(&self) -> bool {
        self.total > self.budget
    }

    /// Entries in order, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.slots.iter().map(|s| &s.entry)
    }

    /// The anchor entry, if one has been set
    pub fn anchor(&self) -> Option<&ContextEntry> {
        self.anchor.and_then(|id| self.get(id))
    }

    /// Look up a surviving entry by id
    pub fn get(&self, id: EntryId) -> Option<&ContextEntry> {
        self.slots.iter().map(|s| &s.entry).find(|e| e.id == id)
    }

    /// Tags for a surviving entry; `None` for evicted, unknown, or untagged
    /// entries
    pub fn tags_for(&self, id: EntryId) -> Option<&HashSet<String>> {
        self.get(id).filter(|e| e.has_tags()).map(|e| &e.tags)
    }

    /// Surviving entries that carry tags, in order
    pub fn tagged_entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries().filter(|e| e.has_tags())
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Evict oldest non-anchor entries until the budget holds or one entry
    /// remains.
    ///
    /// With an anchor at position 0 the victim is position 1; without one it
    /// is position 0. The last surviving entry is never evicted, even when it
    /// alone exceeds the budget.
    fn enforce_budget(&mut self) {
        while self.total > self.budget && self.slots.len() > 1 {
            let victim = if self.anchor.is_some() { 1 } else { 0 };
            let slot = self.slots.remove(victim);
            self.total -= slot.size;
            METRICS.memory_evictions.inc();
            debug!(
                evicted = %slot.entry.id,
                words = slot.size,
                remaining = self.total,
                "evicted oldest entry to restore budget"
            );
        }

        if self.total > self.budget {
            METRICS.memory_overflows.inc();
            warn!(
                words = self.total,
                budget = self.budget,
                "single remaining entry exceeds budget; keeping it"
            );
        }

        METRICS.memory_entries.set(self.slots.len() as i64);
        METRICS.memory_words.set(self.total as i64);
    }
}
