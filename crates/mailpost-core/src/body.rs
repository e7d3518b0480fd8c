//! Markdown body rendering.

use pulldown_cmark::{Parser, html};

/// Renders markdown text to an HTML fragment.
///
/// Follows CommonMark. The trailing newline the renderer emits after the
/// last block is dropped, so single-paragraph input yields exactly
/// `<p>...</p>`.
#[must_use]
pub fn render(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut out, Parser::new(text));
    let len = out.trim_end_matches('\n').len();
    out.truncate(len);
    out
}
