//! HTML page output.
//!
//! The page stacks two layers with identical font metrics: the backdrop markup
//! (highlight spans, transparent text) underneath, and a read-only copy of the
//! buffer on top. Because the backdrop's visible text equals the buffer text,
//! every highlight sits exactly under its token.

use anyhow::{Context, Result};
use core_render::{BackdropFrame, push_escaped};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const STYLE: &str = "\
.container{position:relative;width:100%;}\
.backdrop,.text{font-family:monospace;font-size:16px;line-height:1.4;padding:8px;margin:0;\
white-space:pre-wrap;word-wrap:break-word;box-sizing:border-box;width:100%;}\
.backdrop{position:absolute;top:0;left:0;color:transparent;z-index:0;}\
.text{position:relative;z-index:1;background:transparent;}\
.highlight{border-radius:2px;}";

pub struct PageWriter {
    path: PathBuf,
}

impl PageWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the page for `frame`, showing `buffer` as the text layer.
    pub fn write(&self, buffer: &str, frame: &BackdropFrame) -> Result<()> {
        let html = render_page(buffer, &frame.markup);
        // Readers see either the old page or the new one.
        let tmp = self.path.with_extension("html.tmp");
        fs::write(&tmp, html.as_bytes())
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming to {}", self.path.display()))?;
        debug!(
            target: "runtime.page",
            path = %self.path.display(),
            bytes = html.len(),
            kind = ?frame.kind,
            "page_written"
        );
        Ok(())
    }
}

pub fn render_page(buffer: &str, markup: &str) -> String {
    let mut out = String::with_capacity(buffer.len() + markup.len() + 512);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Artois</title>\n<style>");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n<div class=\"backdrop\">");
    out.push_str(markup);
    out.push_str("</div>\n<div class=\"text\">");
    push_escaped(&mut out, buffer);
    out.push_str("</div>\n</div>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{HighlightColor, HighlightedToken};
    use core_render::{RenderKind, backdrop_text_content, render_backdrop};

    fn frame(markup: &str) -> BackdropFrame {
        BackdropFrame {
            plain_text: String::new(),
            markup: markup.to_string(),
            highlighted: 0,
            kind: RenderKind::Partial,
        }
    }

    #[test]
    fn page_embeds_markup_and_escaped_text() {
        let html = render_page("a < b", "<span class=\"highlight\">a</span> &lt; b");
        assert!(html.contains("<div class=\"backdrop\"><span class=\"highlight\">a</span> &lt; b</div>"));
        assert!(html.contains("<div class=\"text\">a &lt; b</div>"));
    }

    #[test]
    fn text_layer_escapes_like_backdrop() {
        let buffer = "a & b <c> d";
        let tokens = [
            HighlightedToken::plain("a & "),
            HighlightedToken {
                text: "b <c>",
                color: Some(HighlightColor::from_channel(25)),
            },
            HighlightedToken::plain(" d"),
        ];
        let markup = render_backdrop(&tokens);
        assert_eq!(backdrop_text_content(&markup), buffer);
        let html = render_page(buffer, &markup);
        assert!(html.contains("<div class=\"text\">a &amp; b &lt;c&gt; d</div>"));
        assert!(markup.contains("b &lt;c&gt;</span>"));
    }

    #[test]
    fn writer_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let writer = PageWriter::new(&path);
        writer.write("first", &frame("first")).unwrap();
        writer.write("second", &frame("second")).unwrap();
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("second"));
        assert!(!html.contains("first"));
        assert!(!path.with_extension("html.tmp").exists());
        assert_eq!(writer.path(), path.as_path());
    }

    #[test]
    fn missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PageWriter::new(dir.path().join("nope").join("out.html"));
        assert!(writer.write("x", &frame("x")).is_err());
    }
}
