//! Caller-owned memoization of decoration passes.
//!
//! Cursor moves, focus changes and selection updates all ask for decorations
//! of text that hasn't changed. The cache keeps the last few passes keyed by
//! [`hash_source`] and hands back shared results.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::blocks::hash_source;
use crate::decorate::{Decoration, decorate_full};

const DEFAULT_CAPACITY: usize = 8;

/// A cached decoration pass.
#[derive(Clone, Debug)]
pub struct CachedDecoration {
    /// Hash of the decorated text for change detection.
    pub source_hash: u64,
    /// The text itself, compared on hash hits.
    pub source: String,
    pub decoration: Arc<Decoration>,
}

/// Small LRU of decoration passes.
#[derive(Clone, Debug)]
pub struct DecorationCache {
    entries: VecDeque<CachedDecoration>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl Default for DecorationCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl DecorationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Cached decoration of `text`, if present. Refreshes its recency.
    pub fn get(&mut self, text: &str) -> Option<Arc<Decoration>> {
        let hash = hash_source(text);
        let pos = self
            .entries
            .iter()
            .position(|e| e.source_hash == hash && e.source == text)?;
        let entry = self.entries.remove(pos)?;
        let decoration = entry.decoration.clone();
        self.entries.push_front(entry);
        Some(decoration)
    }

    /// Decorate `text`, or return the cached pass for it.
    pub fn get_or_decorate(&mut self, text: &str) -> Arc<Decoration> {
        if let Some(decoration) = self.get(text) {
            self.hits += 1;
            tracing::trace!(
                target: "chatmark::cache",
                hits = self.hits,
                len = text.len(),
                "decoration cache hit"
            );
            return decoration;
        }

        self.misses += 1;
        let decoration = Arc::new(decorate_full(text));
        tracing::trace!(
            target: "chatmark::cache",
            misses = self.misses,
            len = text.len(),
            ranges = decoration.ranges.len(),
            "decoration cache miss"
        );
        self.entries.push_front(CachedDecoration {
            source_hash: hash_source(text),
            source: text.to_owned(),
            decoration: decoration.clone(),
        });
        self.entries.truncate(self.capacity);
        decoration
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
