//! Render scheduler.
//!
//! The event loop drains every queued event before rendering. Producers mark
//! what each event invalidated (`RenderDelta`); `consume` collapses the queue
//! into one `Decision` so a burst of edits costs a single partial update.
//!
//! Merge semantics:
//! - Any `Full` in the queue makes the semantic decision `Full`.
//! - Consecutive `Partial` marks collapse into one.
//! - A `Partial` marked after the last `Full` still needs its own pass
//!   (`Decision::trailing_partial`), because the full render reset the buffer
//!   and the later edit changed it again. Partials marked before the last
//!   `Full` are superseded: the server text replaced whatever they edited.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Render invalidation intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDelta {
    /// A new snapshot arrived; everything is recomputed.
    Full,
    /// The buffer was edited locally; reconcile against the current snapshot.
    Partial,
}

/// Collapsed outcome of one drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub semantic: RenderDelta,
    /// A partial update is still required after the full render (only meaningful when
    /// `semantic == Full`; always `true` for a `Partial` decision).
    pub trailing_partial: bool,
}

impl Decision {
    pub fn needs_full(&self) -> bool {
        self.semantic == RenderDelta::Full
    }

    pub fn needs_partial(&self) -> bool {
        self.trailing_partial
    }
}

#[derive(Debug, Default)]
pub struct RenderDeltaMetrics {
    full: AtomicU64,
    partial: AtomicU64,
    /// Partial marks folded into another mark instead of rendering on their own.
    collapsed_partials: AtomicU64,
    semantic_frames: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderDeltaMetricsSnapshot {
    pub full: u64,
    pub partial: u64,
    pub collapsed_partials: u64,
    pub semantic_frames: u64,
}

impl RenderDeltaMetrics {
    pub fn snapshot(&self) -> RenderDeltaMetricsSnapshot {
        RenderDeltaMetricsSnapshot {
            full: self.full.load(Relaxed),
            partial: self.partial.load(Relaxed),
            collapsed_partials: self.collapsed_partials.load(Relaxed),
            semantic_frames: self.semantic_frames.load(Relaxed),
        }
    }
}

#[derive(Debug, Default)]
pub struct RenderScheduler {
    pending: Vec<RenderDelta>,
    metrics: RenderDeltaMetrics,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, delta: RenderDelta) {
        tracing::trace!(target: "render.scheduler", ?delta, "render_mark");
        self.pending.push(delta);
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn metrics_snapshot(&self) -> RenderDeltaMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Collapse queued marks. `None` when nothing was marked since the last call.
    pub fn consume(&mut self) -> Option<Decision> {
        if self.pending.is_empty() {
            return None;
        }
        let last_full = self.pending.iter().rposition(|d| *d == RenderDelta::Full);
        let last_partial = self
            .pending
            .iter()
            .rposition(|d| *d == RenderDelta::Partial);
        let partial_marks = self
            .pending
            .iter()
            .filter(|d| **d == RenderDelta::Partial)
            .count() as u64;
        let decision = match (last_full, last_partial) {
            (Some(f), Some(p)) => Decision {
                semantic: RenderDelta::Full,
                trailing_partial: p > f,
            },
            (Some(_), None) => Decision {
                semantic: RenderDelta::Full,
                trailing_partial: false,
            },
            (None, _) => Decision {
                semantic: RenderDelta::Partial,
                trailing_partial: true,
            },
        };
        let rendered_partials = u64::from(decision.trailing_partial);
        self.metrics
            .collapsed_partials
            .fetch_add(partial_marks.saturating_sub(rendered_partials), Relaxed);
        match decision.semantic {
            RenderDelta::Full => self.metrics.full.fetch_add(1, Relaxed),
            RenderDelta::Partial => self.metrics.partial.fetch_add(1, Relaxed),
        };
        self.metrics.semantic_frames.fetch_add(1, Relaxed);
        tracing::trace!(target: "render.scheduler", ?decision, queued = self.pending.len(), "render_delta_collapse");
        self.pending.clear();
        Some(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_queue_yields_none() {
        let mut s = RenderScheduler::new();
        assert!(s.consume().is_none());
    }

    #[test]
    fn partials_collapse() {
        let mut s = RenderScheduler::new();
        s.mark(RenderDelta::Partial);
        s.mark(RenderDelta::Partial);
        s.mark(RenderDelta::Partial);
        let d = s.consume().unwrap();
        assert_eq!(d.semantic, RenderDelta::Partial);
        assert!(d.needs_partial());
        assert!(!d.needs_full());
        let m = s.metrics_snapshot();
        assert_eq!(m.collapsed_partials, 2);
        assert_eq!(m.partial, 1);
        assert!(s.is_idle());
    }

    #[test]
    fn partial_before_full_is_superseded() {
        let mut s = RenderScheduler::new();
        s.mark(RenderDelta::Partial);
        s.mark(RenderDelta::Full);
        let d = s.consume().unwrap();
        assert!(d.needs_full());
        assert!(!d.needs_partial());
    }

    #[test]
    fn partial_after_full_survives() {
        let mut s = RenderScheduler::new();
        s.mark(RenderDelta::Full);
        s.mark(RenderDelta::Partial);
        let d = s.consume().unwrap();
        assert!(d.needs_full());
        assert!(d.needs_partial());
    }
}
