//! Incremental re-render engine for attention-highlighted text.
//!
//! Given the last tokenized context (a `ContextSnapshot`) and the live text
//! buffer, the engine decides which prefix of tokens is still valid,
//! recomputes highlights for that prefix only, and rebuilds a markup overlay
//! that tracks the plain buffer character for character.
//!
//! Exposed Components:
//! - `attention`: attention matrix -> per-token average received attention ->
//!   highlight color (materiality threshold 0.05).
//! - `backdrop`: highlighted tokens -> overlay markup, plus the inverse
//!   `backdrop_text_content` used to check the overlay against the buffer.
//! - `render_engine`: `RenderEngine` owning the snapshot; full render per
//!   generation batch, partial update per buffer edit.
//! - `highlight_cache`: per-snapshot memo of highlight vectors keyed by limit.
//! - `scheduler`: collapses the render intents of one event-loop drain into a
//!   single decision.
//! - `partial_metrics`: execution counters and last-render timings.
//!
//! Pipeline:
//! 1. Batch arrives -> `RenderScheduler::mark(Full)`; the loop hands the
//!    snapshot to `RenderEngine::render_full`.
//! 2. Buffer edited -> `mark(Partial)`; after draining, `render_partial`
//!    diffs the last rendered text against the buffer.
//! 3. `Unchanged` reuses the full highlight set; `RecomputeFrom(b)` computes
//!    (or fetches from cache) highlights for `[0, b)` and draws the remaining
//!    buffer text uncolored.
//!
//! Cost: aggregation is quadratic in the confirmed prefix and runs inside the
//! event handler. The memo cache removes repeat work when consecutive edits
//! land on the same token boundary.

pub mod attention;
pub mod backdrop;
pub mod highlight_cache;
pub mod partial_metrics;
pub mod render_engine;
pub mod scheduler;

pub use attention::{MATERIALITY_THRESHOLD, compute_highlights};
pub use backdrop::{backdrop_text_content, push_escaped, render_backdrop};
pub use render_engine::{BackdropFrame, RenderEngine, RenderKind};
