//! Plain-text helpers for the editable buffer.
//!
//! The buffer is addressed in Unicode scalar values (`char`) everywhere the
//! differ and the render engine exchange offsets. Byte offsets never cross a
//! crate boundary; `byte_offset_of_char` is the single conversion point.

pub mod diff;

pub use diff::{PrefixBoundary, common_prefix_chars, unchanged_prefix_token_count};

/// Byte offset of the `char_index`-th scalar value in `text`, clamped to
/// `text.len()` when the index is past the end.
pub fn byte_offset_of_char(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Suffix of `text` starting at scalar value `char_index` (empty when past the end).
pub fn tail_from_char(text: &str, char_index: usize) -> &str {
    &text[byte_offset_of_char(text, char_index)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_offset_handles_multibyte() {
        let s = "aé→b";
        assert_eq!(byte_offset_of_char(s, 0), 0);
        assert_eq!(byte_offset_of_char(s, 2), 3);
        assert_eq!(byte_offset_of_char(s, 3), 6);
        assert_eq!(byte_offset_of_char(s, 99), s.len());
    }

    #[test]
    fn tail_from_char_past_end_is_empty() {
        assert_eq!(tail_from_char("abc", 1), "bc");
        assert_eq!(tail_from_char("abc", 3), "");
        assert_eq!(tail_from_char("", 4), "");
    }
}
