//! Conversion results.

use serde::{Deserialize, Serialize};

/// A materialized image: its stable identifier and the handle the Markdown
/// refers to (a `data:` URI or a path relative to the Markdown file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    pub id: String,
    pub url: String,
}

/// Layout outcome for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// The page's Markdown fragment; empty when nothing survived.
    pub markdown: String,
    /// Images registered while processing this page, in placement order.
    pub images: Vec<ImageResource>,
    /// Text lines and image lines emitted, after filtering.
    pub line_count: usize,
    /// Images dropped because they could not be resolved, decoded or stored.
    pub skipped_images: usize,
    /// Base font size the page was classified against.
    pub base_font_size: f32,
    pub duration_ms: u64,
}

impl PageResult {
    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}

/// Aggregate statistics for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document (or supplied by the caller).
    pub total_pages: usize,
    /// Pages laid out.
    pub processed_pages: usize,
    /// Processed pages that produced no Markdown.
    pub empty_pages: usize,
    pub total_images: usize,
    pub skipped_images: usize,
    pub total_duration_ms: u64,
}

/// The final owned output of a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionResult {
    /// The assembled Markdown document.
    pub markdown: String,
    /// Every registered image, in first-seen order across pages.
    pub images: Vec<ImageResource>,
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}

impl ConversionResult {
    /// Look up an image handle by identifier.
    pub fn image_url(&self, id: &str) -> Option<&str> {
        self.images
            .iter()
            .find(|img| img.id == id)
            .map(|img| img.url.as_str())
    }
}
