//! Line clustering and reading order.
//!
//! Runs whose visual tops are within the line tolerance form one visual
//! line; each surviving image is a line of its own. Sorting every line by
//! its canonical y, highest first, gives top-to-bottom reading order.

use crate::config::LayoutConfig;
use crate::page::TextRun;
use crate::pipeline::filter::run_visual_top;
use crate::pipeline::images::PlacedImage;
use std::cmp::Ordering;

/// Runs sharing a y-cluster. `y` is the visual top of the run that opened it.
#[derive(Debug, Clone)]
pub struct TextLine<'a> {
    pub y: f32,
    pub runs: Vec<&'a TextRun>,
}

#[derive(Debug, Clone)]
pub enum Line<'a> {
    Text(TextLine<'a>),
    Image(PlacedImage),
}

impl Line<'_> {
    /// The canonical y used for global ordering.
    pub fn y(&self) -> f32 {
        match self {
            Line::Text(t) => t.y,
            Line::Image(img) => img.placement.visual_top,
        }
    }
}

/// Group runs into text lines, add image lines, and sort top to bottom.
///
/// A run joins the nearest existing line within tolerance, searching every
/// line on the page; runs inside a line end up sorted by x.
pub fn cluster_lines<'a>(
    runs: impl IntoIterator<Item = &'a TextRun>,
    images: Vec<PlacedImage>,
    layout: &LayoutConfig,
) -> Vec<Line<'a>> {
    let mut text_lines: Vec<TextLine<'a>> = Vec::new();

    for run in runs {
        let y = run_visual_top(run, layout);
        let nearest = text_lines
            .iter()
            .enumerate()
            .map(|(i, line)| (i, (line.y - y).abs()))
            .filter(|&(_, dist)| dist < layout.line_tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        match nearest {
            Some(i) => text_lines[i].runs.push(run),
            None => text_lines.push(TextLine { y, runs: vec![run] }),
        }
    }

    for line in &mut text_lines {
        line.runs.sort_by(|a, b| a.x().partial_cmp(&b.x()).unwrap_or(Ordering::Equal));
    }

    let mut lines: Vec<Line<'a>> = text_lines.into_iter().map(Line::Text).collect();
    lines.extend(images.into_iter().map(Line::Image));
    sort_reading_order(&mut lines);
    lines
}

/// Stable sort by canonical y, descending.
pub fn sort_reading_order(lines: &mut [Line<'_>]) {
    lines.sort_by(|a, b| b.y().partial_cmp(&a.y()).unwrap_or(Ordering::Equal));
}
