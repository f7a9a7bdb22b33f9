//! String assembly and heading classification.
//!
//! Each text line becomes one string (runs joined left to right, with a
//! space wherever the gap between them is wider than a fraction of an em)
//! and a heading level decided purely by font size relative to the page's
//! base size.

use crate::config::LayoutConfig;
use crate::page::TextRun;
use crate::pipeline::images::PlacedImage;
use crate::pipeline::lines::Line;
use crate::pipeline::serialize::strip_invisible;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn prefix(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "#",
            HeadingLevel::H2 => "##",
            HeadingLevel::H3 => "###",
        }
    }
}

/// A line after assembly and classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedLine {
    Text {
        text: String,
        heading: Option<HeadingLevel>,
        /// Max right edge minus min left edge of the line's runs.
        width: f32,
    },
    Image(PlacedImage),
}

/// Processed lines in reading order, plus the widest text line seen.
#[derive(Debug, Clone, Default)]
pub struct ProcessedPage {
    pub lines: Vec<ProcessedLine>,
    pub max_line_width: f32,
}

/// Heading level for a line of the given size, or `None` for body text.
pub fn classify_heading(
    font_size: f32,
    base_font_size: f32,
    layout: &LayoutConfig,
) -> Option<HeadingLevel> {
    if base_font_size <= 0.0 || (font_size - base_font_size).abs() <= layout.heading_min_delta {
        return None;
    }
    let ratio = font_size / base_font_size;
    let [h1, h2, h3] = layout.heading_ratios;
    if ratio >= h1 {
        Some(HeadingLevel::H1)
    } else if ratio >= h2 {
        Some(HeadingLevel::H2)
    } else if ratio >= h3 {
        Some(HeadingLevel::H3)
    } else {
        None
    }
}

/// Join x-sorted runs into one string.
///
/// A space goes in when the gap before a run exceeds `space_gap_ratio` of
/// that run's font size and neither side already has whitespace.
/// Invisible characters are removed from each run before any whitespace
/// test, so they can neither hide nor add spacing.
pub fn assemble_text(runs: &[&TextRun], layout: &LayoutConfig) -> String {
    let mut out = String::new();
    let mut prev_right: Option<f32> = None;

    for run in runs {
        let content = strip_invisible(&run.content);
        if let Some(right) = prev_right {
            let gap = run.x() - right;
            if gap > layout.space_gap_ratio * run.font_size()
                && !out.ends_with(char::is_whitespace)
                && !content.starts_with(char::is_whitespace)
            {
                out.push(' ');
            }
        }
        out.push_str(&content);
        prev_right = Some(run.right());
    }

    out.trim().to_string()
}

fn line_width(runs: &[&TextRun]) -> f32 {
    let left = runs.iter().map(|r| r.x()).fold(f32::INFINITY, f32::min);
    let right = runs.iter().map(|r| r.right()).fold(f32::NEG_INFINITY, f32::max);
    if left.is_finite() && right.is_finite() {
        (right - left).max(0.0)
    } else {
        0.0
    }
}

/// Assemble and classify every line. Text lines that assemble to nothing
/// are dropped.
pub fn process_lines(lines: Vec<Line<'_>>, base_font_size: f32, layout: &LayoutConfig) -> ProcessedPage {
    let mut page = ProcessedPage::default();

    for line in lines {
        match line {
            Line::Image(image) => page.lines.push(ProcessedLine::Image(image)),
            Line::Text(t) => {
                let text = assemble_text(&t.runs, layout);
                if text.is_empty() {
                    continue;
                }
                let font_size = t.runs.iter().map(|r| r.font_size()).fold(0.0, f32::max);
                let width = line_width(&t.runs);
                page.max_line_width = page.max_line_width.max(width);
                page.lines.push(ProcessedLine::Text {
                    text,
                    heading: classify_heading(font_size, base_font_size, layout),
                    width,
                });
            }
        }
    }

    page
}
