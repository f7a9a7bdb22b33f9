//! Font statistics: the page's dominant ("base") font size.
//!
//! Runs are bucketed by rounded size and weighted by character count, so a
//! page of 10 pt body text with a 24 pt title still reports 10. This runs on
//! the unfiltered run list so header/footer furniture cannot pull the base
//! away from the body text.

use crate::page::{TextRun, DEFAULT_FONT_SIZE};
use std::collections::BTreeMap;

/// Rounded font size → cumulative character count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFontStats {
    buckets: BTreeMap<i32, usize>,
}

impl PageFontStats {
    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a TextRun>) -> Self {
        let mut stats = Self::default();
        for run in runs {
            stats.add(run.font_size(), run.content.chars().count());
        }
        stats
    }

    pub fn add(&mut self, font_size: f32, chars: usize) {
        let key = font_size.round() as i32;
        if key > 0 {
            *self.buckets.entry(key).or_insert(0) += chars;
        }
    }

    /// The size with the largest character count; the smaller size wins a
    /// tie. [`DEFAULT_FONT_SIZE`] when the page has no text.
    pub fn base_font_size(&self) -> f32 {
        // Ascending iteration + strict `>` keeps the smallest key on ties,
        // which makes the result independent of run order.
        let mut best: Option<(i32, usize)> = None;
        for (&size, &count) in &self.buckets {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((size, count));
            }
        }
        best.map_or(DEFAULT_FONT_SIZE, |(size, _)| size as f32)
    }
}

/// Base font size of a page, computed from all of its runs.
pub fn estimate_base_font_size(runs: &[TextRun]) -> f32 {
    PageFontStats::from_runs(runs).base_font_size()
}
