//! Markdown serialization.
//!
//! Every block is written as its text followed by one blank line, so page
//! fragments can be concatenated directly. The output is deterministic:
//! the same blocks always render to the same bytes.

use crate::config::PageSeparator;
use crate::pipeline::paragraph::Block;

// ── Text cleanup ─────────────────────────────────────────────────────────────

/// Zero-width space, BOM, soft hyphen, ZWNJ, ZWJ, word joiner.
const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

/// Remove invisible formatting characters that survive text extraction.
pub fn strip_invisible(input: &str) -> String {
    input.replace(INVISIBLE, "")
}

// ── Rendering ────────────────────────────────────────────────────────────────

pub fn render_block(block: &Block, out: &mut String) {
    match block {
        Block::Heading { level, text } => {
            out.push_str(level.prefix());
            out.push(' ');
            out.push_str(text);
        }
        Block::Paragraph(text) => out.push_str(text),
        Block::Image { url } => {
            out.push_str("![Image](");
            out.push_str(url);
            out.push(')');
        }
    }
    out.push_str("\n\n");
}

/// Render one page's blocks. A page with no visible content renders as "".
pub fn render_page(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        render_block(block, &mut out);
    }
    if out.trim().is_empty() {
        String::new()
    } else {
        out
    }
}

/// Concatenate page fragments in order, placing the separator before every
/// non-empty fragment after the first.
///
/// `pages` yields `(1-based page number, fragment)`.
pub fn render_document<'a>(
    pages: impl IntoIterator<Item = (usize, &'a str)>,
    separator: &PageSeparator,
) -> String {
    let mut out = String::new();
    for (page_num, fragment) in pages {
        if fragment.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(&separator.render(page_num));
        }
        out.push_str(fragment);
    }
    out
}
