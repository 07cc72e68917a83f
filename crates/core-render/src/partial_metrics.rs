//! Render path metrics.
//!
//! Execution counters for the two render triggers. `full_frames` and
//! `partial_frames` count what the engine did; the remaining counters explain
//! how much of the highlight work each partial update could skip.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RenderPathMetrics {
    /// Full renders (one per generation batch applied).
    pub full_frames: AtomicU64,
    /// Partial updates (one per buffer edit reconciled).
    pub partial_frames: AtomicU64,
    /// Renders that produced an empty backdrop because tokens or attention were missing.
    pub empty_frames: AtomicU64,
    /// Partial updates where the differ reported every token unchanged.
    pub highlights_reused: AtomicU64,
    /// Highlight vectors served from the memo cache.
    pub cache_hits: AtomicU64,
    /// Tokens whose highlight was recomputed (sum of limits actually aggregated).
    pub tokens_recomputed: AtomicU64,
    /// Duration (ns) of the most recent full render.
    pub last_full_render_ns: AtomicU64,
    /// Duration (ns) of the most recent partial update.
    pub last_partial_render_ns: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderPathMetricsSnapshot {
    pub full_frames: u64,
    pub partial_frames: u64,
    pub empty_frames: u64,
    pub highlights_reused: u64,
    pub cache_hits: u64,
    pub tokens_recomputed: u64,
    pub last_full_render_ns: u64,
    pub last_partial_render_ns: u64,
}

impl RenderPathMetrics {
    pub fn snapshot(&self) -> RenderPathMetricsSnapshot {
        RenderPathMetricsSnapshot {
            full_frames: self.full_frames.load(Ordering::Relaxed),
            partial_frames: self.partial_frames.load(Ordering::Relaxed),
            empty_frames: self.empty_frames.load(Ordering::Relaxed),
            highlights_reused: self.highlights_reused.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            tokens_recomputed: self.tokens_recomputed.load(Ordering::Relaxed),
            last_full_render_ns: self.last_full_render_ns.load(Ordering::Relaxed),
            last_partial_render_ns: self.last_partial_render_ns.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn store(counter: &AtomicU64, n: u64) {
        counter.store(n, Ordering::Relaxed);
    }
}
