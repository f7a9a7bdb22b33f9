//! Header/footer filtering.
//!
//! Page furniture (running heads, page numbers, dates, URLs) sits in narrow
//! bands at the top and bottom of the page. A run in those bands is dropped
//! when it looks like furniture, either by pattern or by being set smaller
//! than the body text. Anything else in the bands, such as a title pushed
//! up against the top margin, survives.

use crate::config::LayoutConfig;
use crate::pipeline::transform::ImagePlacement;
use crate::page::TextRun;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "3", "3 / 12", "3/12"
        r"^\d{1,4}(\s*/\s*\d{1,4})?$",
        // "(3)", "- 3 -"
        r"^\(\s*\d{1,4}\s*\)$",
        r"^[-–—]\s*\d{1,4}\s*[-–—]$",
        // "Page 3", "page 3 of 12"
        r"(?i)^page\s+\d{1,4}(\s+(of|/)\s+\d{1,4})?$",
        // "2024-03-01", "2024/3/1", "2024.03.01"
        r"^\d{4}[-/.]\d{1,2}[-/.]\d{1,2}$",
        r"(?i)^(https?|ftp)://\S+$",
        r"(?i)^www\.[a-z0-9-]+(\.[a-z0-9-]+)+(/\S*)?$",
        // "example.org/path"; a bare name needs a common TLD so titles like
        // "Node.js" or "README.md" are not mistaken for one.
        r"(?i)^[a-z0-9-]+(\.[a-z0-9-]+)*\.(com|org|net|edu|gov|int|info|io|ai|dev|ac|uk|us|de|fr|jp|cn|eu|ca|au)(/\S*)?$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Runs made only of glyphs with no Unicode mapping (U+FFFD, NUL, control
/// and zero-width characters) never render as readable text.
static NO_RENDER_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s\x00-\x08\x0E-\x1F\x{FFFD}\x{200B}-\x{200D}\x{2060}\x{FEFF}]+$").unwrap()
});

pub fn is_boilerplate(text: &str) -> bool {
    let t = text.trim();
    BOILERPLATE.iter().any(|re| re.is_match(t))
}

pub fn is_placeholder(text: &str) -> bool {
    NO_RENDER_PLACEHOLDER.is_match(text)
}

/// Approximate cap height: baseline plus a fraction of the font size.
pub fn run_visual_top(run: &TextRun, layout: &LayoutConfig) -> f32 {
    run.y() + layout.cap_height_ratio * run.font_size()
}

fn in_edge_bands(y: f32, page_height: f32, layout: &LayoutConfig) -> bool {
    let in_footer = y >= 0.0 && y < layout.footer_height;
    let in_header = y > page_height - layout.header_height && y <= page_height;
    in_footer || in_header
}

/// Keep the runs that are page content, in their original order.
pub fn filter_text_runs<'a>(
    runs: &'a [TextRun],
    page_height: f32,
    base_font_size: f32,
    layout: &LayoutConfig,
) -> Vec<&'a TextRun> {
    let min_edge_size = base_font_size * layout.small_font_ratio;

    let kept: Vec<&TextRun> = runs
        .iter()
        .filter(|run| {
            if run.content.trim().is_empty() || is_placeholder(&run.content) {
                return false;
            }
            let top = run_visual_top(run, layout);
            if !in_edge_bands(top, page_height, layout) {
                return true;
            }
            let drop = is_boilerplate(&run.content) || run.font_size() < min_edge_size;
            if drop {
                debug!("Dropping edge run {:?} at y={:.1}", run.content, top);
            }
            !drop
        })
        .collect();

    debug!("Text filter kept {}/{} runs", kept.len(), runs.len());
    kept
}

/// Images are only dropped when their top practically touches an edge.
pub fn keep_image(placement: &ImagePlacement, page_height: f32, layout: &LayoutConfig) -> bool {
    let top = placement.visual_top;
    let margin = layout.image_edge_margin;
    !(top > page_height - margin || top < margin)
}
