//! Paragraph assembly.
//!
//! Consecutive body lines merge into one paragraph until a line that ends
//! short of the page's widest line. A short line is taken as the last line
//! of its paragraph, so the next line opens a new one. Headings and images
//! always stand alone.

use crate::config::LayoutConfig;
use crate::pipeline::classify::{HeadingLevel, ProcessedLine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: HeadingLevel, text: String },
    Paragraph(String),
    Image { url: String },
}

/// CJK ideographs, CJK symbols/punctuation and full-width forms.
pub fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3000}'..='\u{303F}' | '\u{FF00}'..='\u{FFEF}')
}

/// Append `next` to a paragraph. CJK on both sides of the join needs no
/// separator; otherwise one space unless either side already has one.
pub fn join_lines(paragraph: &mut String, next: &str) {
    let (Some(last), Some(first)) = (paragraph.chars().next_back(), next.chars().next()) else {
        paragraph.push_str(next);
        return;
    };
    if !(is_cjk(last) && is_cjk(first)) && !last.is_whitespace() && !first.is_whitespace() {
        paragraph.push(' ');
    }
    paragraph.push_str(next);
}

/// Turn processed lines (already in reading order) into blocks.
pub fn assemble_blocks(
    lines: Vec<ProcessedLine>,
    max_line_width: f32,
    layout: &LayoutConfig,
) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut open: Option<String> = None;
    let mut prev_width = 0.0_f32;
    let short_line = layout.paragraph_width_ratio * max_line_width;

    for line in lines {
        match line {
            ProcessedLine::Image(image) => {
                blocks.extend(open.take().map(Block::Paragraph));
                blocks.push(Block::Image {
                    url: image.resource.url,
                });
            }
            ProcessedLine::Text {
                text,
                heading: Some(level),
                ..
            } => {
                blocks.extend(open.take().map(Block::Paragraph));
                blocks.push(Block::Heading { level, text });
            }
            ProcessedLine::Text {
                text,
                heading: None,
                width,
                ..
            } => {
                match open.as_mut() {
                    Some(para) if prev_width >= short_line => join_lines(para, &text),
                    // Starts a paragraph, flushing the open one if any.
                    _ => blocks.extend(open.replace(text).map(Block::Paragraph)),
                }
                prev_width = width;
            }
        }
    }

    blocks.extend(open.map(Block::Paragraph));
    blocks
}
