//! Per-page layout driver.
//!
//! Runs the stages in order for one page and produces its [`PageResult`]:
//!
//! ```text
//! runs ──▶ fonts ──▶ filter ─┐
//!                            ├──▶ lines ──▶ classify ──▶ paragraph ──▶ serialize
//! operators ──▶ transform ──▶ images (materialize + register) ──▶ edge filter ─┘
//! ```
//!
//! All per-page state is owned by this function; the only state that
//! outlives a page is the document's [`ImageRegistry`].

use crate::config::{ConversionConfig, ImageOutput};
use crate::output::PageResult;
use crate::page::{ImageResolver, PageContent};
use crate::pipeline::classify::process_lines;
use crate::pipeline::filter::{filter_text_runs, keep_image};
use crate::pipeline::fonts::estimate_base_font_size;
use crate::pipeline::images::{materialize, ImageRegistry, PlacedImage};
use crate::pipeline::lines::cluster_lines;
use crate::pipeline::paragraph::assemble_blocks;
use crate::pipeline::serialize::render_page;
use crate::pipeline::transform::track_images;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lay out one page. Image failures are counted and reported; they never
/// fail the page.
///
/// `page_num` is the page's position in the document. It drives image ids
/// and the result's page number; `page.number` is not consulted, so pages
/// from a source that does not number them still get unique ids.
pub async fn process_page(
    page_num: usize,
    page: &PageContent,
    resolver: &dyn ImageResolver,
    registry: &mut ImageRegistry,
    config: &ConversionConfig,
) -> PageResult {
    let start = Instant::now();
    let layout = &config.layout;

    // ── Fonts ────────────────────────────────────────────────────────────
    let base_font_size = estimate_base_font_size(&page.text_runs);
    debug!("Page {}: base font size {}", page_num, base_font_size);

    // ── Images ───────────────────────────────────────────────────────────
    let mut skipped_images = 0;
    let mut page_images = Vec::new();
    let mut placed = Vec::new();

    if !matches!(config.image_output, ImageOutput::Omit) {
        let tracked = track_images(page_num, &page.operators, resolver);
        for failure in &tracked.failures {
            skipped_images += 1;
            report_skip(config, page_num, failure.id(), &failure.to_string());
        }

        for painted in tracked.painted {
            let placement = painted.placement.clone();
            let registered = match materialize(painted, &config.image_output).await {
                Ok(resource) => registry.register(resource.clone()).map(|_| resource),
                Err(e) => Err(e),
            };
            match registered {
                Ok(resource) => {
                    page_images.push(resource.clone());
                    if keep_image(&placement, page.height, layout) {
                        placed.push(PlacedImage {
                            placement,
                            resource,
                        });
                    } else {
                        debug!(
                            "Page {}: image {} touches the page edge, not emitted",
                            page_num, placement.id
                        );
                    }
                }
                Err(e) => {
                    warn!("Page {}: skipping image {}: {}", page_num, placement.id, e);
                    skipped_images += 1;
                    report_skip(config, page_num, &placement.id, &e.to_string());
                }
            }
        }
    }

    // ── Text ─────────────────────────────────────────────────────────────
    let runs = filter_text_runs(&page.text_runs, page.height, base_font_size, layout);
    let lines = cluster_lines(runs, placed, layout);
    let processed = process_lines(lines, base_font_size, layout);
    let line_count = processed.lines.len();
    let blocks = assemble_blocks(processed.lines, processed.max_line_width, layout);
    let markdown = render_page(&blocks);

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Page {}: {} lines, {} blocks, {} images ({} skipped) in {}ms",
        page_num,
        line_count,
        blocks.len(),
        page_images.len(),
        skipped_images,
        duration_ms
    );

    PageResult {
        page_num,
        markdown,
        images: page_images,
        line_count,
        skipped_images,
        base_font_size,
        duration_ms,
    }
}

fn report_skip(config: &ConversionConfig, page_num: usize, image: &str, reason: &str) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_image_skipped(page_num, image, reason);
    }
}
