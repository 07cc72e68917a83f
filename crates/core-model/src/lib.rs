//! Token model shared by the differ, the attention aggregator and the render engine.
//!
//! A generation batch produces one `ContextSnapshot`: the ordered token
//! fragments of the whole context plus the pairwise attention matrix the
//! server computed over them. Everything downstream treats a snapshot as an
//! immutable value; highlight colors live in a separate `HighlightVector`
//! rather than on the tokens themselves.
//!
//! Invariants:
//! - Concatenating `Token::text` in order reconstructs the context exactly
//!   (no gaps, no overlaps). `ContextSnapshot::text` is that concatenation.
//! - `AttentionMatrix` is indexed by token position. Reads outside the rows or
//!   columns the server supplied return `0.0`, so a ragged or short matrix
//!   degrades to "no attention" instead of panicking.
//! - A snapshot is renderable only when both tokens and attention are present
//!   (`ContextSnapshot::is_renderable`).

use serde::{Deserialize, Serialize};

mod highlight;
pub use highlight::{HighlightColor, HighlightVector, HighlightedToken};

/// A contiguous fragment of generated text, the atomic unit for highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Length in Unicode scalar values (the unit the differ counts in).
    #[inline]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Causal pairwise attention weights: `weight(i, j)` is the attention token
/// `i` paid to token `j`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttentionMatrix {
    rows: Vec<Vec<f64>>,
}

impl AttentionMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows (token positions) supplied by the server.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Weight at `(row, col)`, `0.0` when the entry was not supplied.
    #[inline]
    pub fn weight(&self, row: usize, col: usize) -> f64 {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, row: usize) -> &[f64] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Tokens plus attention for one server response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub attention: AttentionMatrix,
}

impl ContextSnapshot {
    pub fn new(tokens: Vec<Token>, attention: AttentionMatrix) -> Self {
        Self { tokens, attention }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot for a server that answers with plain text only: one token, no attention.
    pub fn from_plain_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = if text.is_empty() {
            Vec::new()
        } else {
            vec![Token::new(text)]
        };
        Self {
            tokens,
            attention: AttentionMatrix::empty(),
        }
    }

    /// Exact concatenation of all token texts.
    pub fn text(&self) -> String {
        let cap = self.tokens.iter().map(|t| t.text.len()).sum();
        let mut out = String::with_capacity(cap);
        for t in &self.tokens {
            out.push_str(&t.text);
        }
        out
    }

    #[inline]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// True when there is something to highlight: tokens and attention both present.
    pub fn is_renderable(&self) -> bool {
        !self.tokens.is_empty() && !self.attention.is_empty()
    }

    /// Character offset (scalar values) at which token `index` starts. `index ==
    /// token_count()` yields the total length.
    pub fn char_offset_of(&self, index: usize) -> usize {
        self.tokens.iter().take(index).map(Token::char_len).sum()
    }
}
