//! Context differ: how much of a token stream survives a buffer edit.
//!
//! Compares the text the tokens last rendered as (`old`) against the live
//! buffer (`new`) positionally from the start, then maps the matching
//! character count onto token boundaries.
//!
//! Contract:
//! - `old == new` => `PrefixBoundary::Unchanged`.
//! - Otherwise the first token whose cumulative character length exceeds the
//!   matching prefix is the first token needing recomputation
//!   (`RecomputeFrom(index)`). If every token fits inside the matching
//!   prefix (pure append, or trailing edits past the last token) the result
//!   is `Unchanged`.
//! - Total for every input: empty buffers, full replacement and shrinking
//!   edits resolve to `RecomputeFrom(0)` at worst.

use core_model::Token;

/// Result of diffing a buffer edit against a token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixBoundary {
    /// Every token is still confirmed; prior highlights remain valid.
    Unchanged,
    /// Tokens `[0, index)` are confirmed; `index` and later must be recomputed.
    RecomputeFrom(usize),
}

impl PrefixBoundary {
    /// Number of confirmed tokens given the stream length.
    pub fn confirmed_tokens(self, token_count: usize) -> usize {
        match self {
            PrefixBoundary::Unchanged => token_count,
            PrefixBoundary::RecomputeFrom(i) => i.min(token_count),
        }
    }

    pub fn is_unchanged(self) -> bool {
        matches!(self, PrefixBoundary::Unchanged)
    }
}

/// Count of scalar values that match positionally from index 0.
pub fn common_prefix_chars(old: &str, new: &str) -> usize {
    old.chars()
        .zip(new.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Index of the first token not fully covered by the unchanged prefix of `new`.
pub fn unchanged_prefix_token_count(old: &str, new: &str, tokens: &[Token]) -> PrefixBoundary {
    if old == new {
        return PrefixBoundary::Unchanged;
    }
    let unchanged_chars = common_prefix_chars(old, new);
    let mut cumulative = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        cumulative += token.char_len();
        if cumulative > unchanged_chars {
            tracing::trace!(
                target: "text.diff",
                unchanged_chars,
                boundary = index,
                tokens = tokens.len(),
                "prefix_boundary"
            );
            return PrefixBoundary::RecomputeFrom(index);
        }
    }
    PrefixBoundary::Unchanged
}
