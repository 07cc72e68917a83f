//! Render orchestrator: owns the current snapshot and produces backdrop frames.
//!
//! Two triggers drive it:
//! - `render_full` after a generation batch: the snapshot is replaced
//!   wholesale, highlights are computed over every token, and the displayed
//!   text becomes the exact token concatenation (the server is authoritative
//!   after generation, even over what the user typed meanwhile).
//! - `render_partial` after a local buffer edit: the differ compares the last
//!   rendered text against the live buffer, highlights are recomputed only for
//!   the confirmed token prefix, and the rest of the buffer is drawn
//!   uncolored. The snapshot is only borrowed here; the working token sequence
//!   is a fresh `Vec<HighlightedToken>` so later diffs keep seeing the
//!   canonical snapshot.
//!
//! Invariants:
//! - The visible text of every frame's markup equals the frame's `plain_text`
//!   (the buffer on partial updates, the token text on full renders), except
//!   for degenerate snapshots, which render empty markup.
//! - `rendered_text` always equals `snapshot.text()`.
//! - `full_highlights` is computed against `snapshot` with `limit =
//!   token_count` and is reused verbatim whenever the differ reports
//!   `Unchanged`.

use crate::attention::compute_highlights;
use crate::backdrop::render_backdrop;
use crate::highlight_cache::HighlightCache;
use crate::partial_metrics::{RenderPathMetrics, RenderPathMetricsSnapshot};
use core_model::{ContextSnapshot, HighlightVector, HighlightedToken};
use core_text::{PrefixBoundary, tail_from_char, unchanged_prefix_token_count};
use std::borrow::Cow;
use std::time::Instant;
use tracing::debug;

/// Which trigger produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Full,
    Partial,
    /// No tokens or no attention: empty markup, no highlight work.
    Empty,
}

/// Output of one render: the text to show in the editable buffer and the overlay markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackdropFrame {
    pub plain_text: String,
    pub markup: String,
    /// Number of tokens carrying a highlight in this frame.
    pub highlighted: usize,
    pub kind: RenderKind,
}

impl BackdropFrame {
    fn empty(plain_text: String) -> Self {
        Self {
            plain_text,
            markup: String::new(),
            highlighted: 0,
            kind: RenderKind::Empty,
        }
    }
}

#[derive(Debug, Default)]
pub struct RenderEngine {
    snapshot: Option<ContextSnapshot>,
    rendered_text: String,
    full_highlights: HighlightVector,
    cache: HighlightCache,
    metrics: RenderPathMetrics,
    last_boundary: Option<PrefixBoundary>,
}

impl RenderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot and render every token.
    pub fn render_full(&mut self, snapshot: ContextSnapshot) -> BackdropFrame {
        let start = Instant::now();
        let plain_text = snapshot.text();
        let token_count = snapshot.token_count();
        self.cache.reset();
        self.last_boundary = None;

        let frame = if snapshot.is_renderable() {
            let highlights = compute_highlights(&snapshot.attention, token_count);
            RenderPathMetrics::add(&self.metrics.tokens_recomputed, token_count as u64);
            self.cache.insert(token_count, highlights.clone());
            let markup = render_backdrop(&highlights.apply(&snapshot.tokens));
            let highlighted = highlights.highlighted_count();
            self.full_highlights = highlights;
            BackdropFrame {
                plain_text: plain_text.clone(),
                markup,
                highlighted,
                kind: RenderKind::Full,
            }
        } else {
            RenderPathMetrics::incr(&self.metrics.empty_frames);
            self.full_highlights = HighlightVector::default();
            BackdropFrame::empty(plain_text.clone())
        };

        self.rendered_text = plain_text;
        self.snapshot = Some(snapshot);
        RenderPathMetrics::incr(&self.metrics.full_frames);
        let elapsed = start.elapsed().as_nanos() as u64;
        RenderPathMetrics::store(&self.metrics.last_full_render_ns, elapsed);
        debug!(
            target: "render.engine",
            tokens = token_count,
            highlighted = frame.highlighted,
            text_len = frame.plain_text.len(),
            elapsed_ns = elapsed,
            "render_full"
        );
        frame
    }

    /// Reconcile the overlay with a locally edited buffer.
    pub fn render_partial(&mut self, buffer: &str) -> BackdropFrame {
        let start = Instant::now();
        RenderPathMetrics::incr(&self.metrics.partial_frames);

        let Some(snapshot) = self.snapshot.as_ref().filter(|s| s.is_renderable()) else {
            RenderPathMetrics::incr(&self.metrics.empty_frames);
            self.last_boundary = None;
            return BackdropFrame::empty(buffer.to_string());
        };

        let boundary = unchanged_prefix_token_count(&self.rendered_text, buffer, &snapshot.tokens);
        self.last_boundary = Some(boundary);
        let confirmed = boundary.confirmed_tokens(snapshot.token_count());

        let highlights: Cow<'_, HighlightVector> = match boundary {
            PrefixBoundary::Unchanged => {
                RenderPathMetrics::incr(&self.metrics.highlights_reused);
                Cow::Borrowed(&self.full_highlights)
            }
            PrefixBoundary::RecomputeFrom(limit) => {
                let (hv, hit) = self
                    .cache
                    .get_or_compute(limit, || compute_highlights(&snapshot.attention, limit));
                if hit {
                    RenderPathMetrics::incr(&self.metrics.cache_hits);
                } else {
                    RenderPathMetrics::add(&self.metrics.tokens_recomputed, limit as u64);
                }
                Cow::Owned(hv)
            }
        };

        let mut working: Vec<HighlightedToken<'_>> =
            highlights.apply(&snapshot.tokens[..confirmed]);
        let tail = tail_from_char(buffer, snapshot.char_offset_of(confirmed));
        if !tail.is_empty() {
            working.push(HighlightedToken::plain(tail));
        }
        let markup = render_backdrop(&working);
        let highlighted = working.iter().filter(|t| t.color.is_some()).count();

        let elapsed = start.elapsed().as_nanos() as u64;
        RenderPathMetrics::store(&self.metrics.last_partial_render_ns, elapsed);
        debug!(
            target: "render.engine",
            ?boundary,
            confirmed,
            tail_len = tail.len(),
            highlighted,
            elapsed_ns = elapsed,
            "render_partial"
        );
        BackdropFrame {
            plain_text: buffer.to_string(),
            markup,
            highlighted,
            kind: RenderKind::Partial,
        }
    }

    /// Forget the snapshot and every cached highlight.
    pub fn clear(&mut self) {
        self.snapshot = None;
        self.rendered_text.clear();
        self.full_highlights = HighlightVector::default();
        self.cache.clear();
        self.last_boundary = None;
    }

    pub fn snapshot(&self) -> Option<&ContextSnapshot> {
        self.snapshot.as_ref()
    }

    /// Plain text of the last full render (the differ's reference text).
    pub fn rendered_text(&self) -> &str {
        &self.rendered_text
    }

    pub fn full_highlights(&self) -> &HighlightVector {
        &self.full_highlights
    }

    /// Differ outcome of the most recent partial update.
    pub fn last_boundary(&self) -> Option<PrefixBoundary> {
        self.last_boundary
    }

    pub fn metrics_snapshot(&self) -> RenderPathMetricsSnapshot {
        self.metrics.snapshot()
    }
}
