//! Backdrop markup: the styled copy of the buffer drawn behind the editable text.
//!
//! The backdrop must line up with the plain text glyph for glyph, so it emits
//! exactly the token text and nothing else visible: colored tokens get a
//! background-colored span, uncolored tokens are emitted bare.
//!
//! Trust boundary: token text arrives from the inference server and is assumed
//! pre-sanitized. Only `&`, `<` and `>` are escaped, which is what embedding
//! raw text inside markup requires; no other transformation is applied.

use core_model::HighlightedToken;

const SPAN_CLASS: &str = "highlight";

/// Render the overlay markup for a token sequence.
pub fn render_backdrop(tokens: &[HighlightedToken<'_>]) -> String {
    let cap = tokens.iter().map(|t| t.text.len()).sum::<usize>() + tokens.len() * 16;
    let mut out = String::with_capacity(cap);
    for token in tokens {
        match token.color {
            Some(color) => {
                out.push_str("<span class=\"");
                out.push_str(SPAN_CLASS);
                out.push_str("\" style=\"background-color: ");
                out.push_str(&color.to_string());
                out.push_str("\">");
                push_escaped(&mut out, token.text);
                out.push_str("</span>");
            }
            None => push_escaped(&mut out, token.text),
        }
    }
    out
}

/// Append `text` with `&`, `<` and `>` escaped. Shared by every writer that
/// embeds buffer text in markup, so both page layers escape identically.
pub fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Visible text of backdrop markup: tags removed, the three escaped entities decoded.
///
/// Only understands markup produced by `render_backdrop`.
pub fn backdrop_text_content(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with('<') {
            match tail.find('>') {
                Some(end) => rest = &tail[end + 1..],
                None => {
                    rest = "";
                }
            }
        } else if let Some(after) = tail.strip_prefix("&amp;") {
            out.push('&');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("&lt;") {
            out.push('<');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("&gt;") {
            out.push('>');
            rest = after;
        } else {
            out.push('&');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
