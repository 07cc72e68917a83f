//! Highlight values produced by the attention aggregator.
//!
//! A highlight is always a shade of red: red fixed at 255, green and blue
//! both equal to `channel`. Lower `channel` means darker red (more attention).

use crate::Token;
use std::fmt;

/// Visual intensity of one highlighted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightColor {
    channel: u8,
}

impl HighlightColor {
    pub const fn from_channel(channel: u8) -> Self {
        Self { channel }
    }

    #[inline]
    pub const fn channel(self) -> u8 {
        self.channel
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb(255,{},{})", self.channel, self.channel)
    }
}

/// Per-token highlight assignment. Index 0 is never highlighted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightVector {
    entries: Vec<Option<HighlightColor>>,
}

impl HighlightVector {
    /// `len` entries, all unhighlighted.
    pub fn unhighlighted(len: usize) -> Self {
        Self {
            entries: vec![None; len],
        }
    }

    pub fn from_entries(entries: Vec<Option<HighlightColor>>) -> Self {
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highlight for token `index`; indices past the end are unhighlighted.
    #[inline]
    pub fn get(&self, index: usize) -> Option<HighlightColor> {
        self.entries.get(index).copied().flatten()
    }

    pub fn set(&mut self, index: usize, color: Option<HighlightColor>) {
        if let Some(slot) = self.entries.get_mut(index) {
            *slot = color;
        }
    }

    /// Number of entries carrying a color.
    pub fn highlighted_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn as_slice(&self) -> &[Option<HighlightColor>] {
        &self.entries
    }

    /// Pair every token with its highlight. Tokens beyond the vector stay uncolored.
    pub fn apply<'a>(&self, tokens: &'a [Token]) -> Vec<HighlightedToken<'a>> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, t)| HighlightedToken::new(&t.text, self.get(i)))
            .collect()
    }
}

/// Rendered form of a token: borrowed text plus an optional color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightedToken<'a> {
    pub text: &'a str,
    pub color: Option<HighlightColor>,
}

impl<'a> HighlightedToken<'a> {
    pub fn new(text: &'a str, color: Option<HighlightColor>) -> Self {
        Self { text, color }
    }

    pub fn plain(text: &'a str) -> Self {
        Self { text, color: None }
    }
}
