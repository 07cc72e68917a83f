//! Highlight memo cache.
//!
//! Stores highlight vectors computed against the current snapshot, keyed by
//! the `limit` they were computed for. Repeated keystrokes that land on the
//! same token boundary reuse the stored vector instead of re-running the
//! quadratic aggregation.
//!
//! Lifecycle:
//! * `reset` on every full render: entries belong to exactly one snapshot.
//! * `clear` when the engine drops its snapshot; inserts are ignored until
//!   the next `reset`.
//! * Entries are never invalidated individually; a snapshot never changes
//!   while it is cached.

use ahash::AHashMap;
use core_model::HighlightVector;

#[derive(Debug, Default)]
pub struct HighlightCache {
    active: bool,
    by_limit: AHashMap<usize, HighlightVector>,
}

impl HighlightCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry and detach from the snapshot.
    pub fn clear(&mut self) {
        self.active = false;
        self.by_limit.clear();
    }

    /// Start caching for a new snapshot.
    pub fn reset(&mut self) {
        self.by_limit.clear();
        self.active = true;
    }

    /// Whether entries are currently tied to a snapshot.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn get(&self, limit: usize) -> Option<&HighlightVector> {
        self.by_limit.get(&limit)
    }

    pub fn insert(&mut self, limit: usize, highlights: HighlightVector) {
        if !self.active {
            return;
        }
        self.by_limit.insert(limit, highlights);
    }

    /// Cached entry for `limit` or the result of `compute`, which is then stored.
    /// Returns whether the entry was a hit alongside the vector.
    pub fn get_or_compute<F>(&mut self, limit: usize, compute: F) -> (HighlightVector, bool)
    where
        F: FnOnce() -> HighlightVector,
    {
        if let Some(hit) = self.by_limit.get(&limit) {
            return (hit.clone(), true);
        }
        let computed = compute();
        self.insert(limit, computed.clone());
        (computed, false)
    }

    pub fn len(&self) -> usize {
        self.by_limit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_limit.is_empty()
    }
}
