//! Eager (full-document) conversion entry points.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: lay out every page, then return.
//! It collects every [`PageResult`] into memory and assembles the final
//! Markdown document before returning. Use [`crate::stream::convert_stream`]
//! instead when you want pages progressively.
//!
//! A document either converts completely or fails: when the page source
//! cannot produce page N, the error names page N and no partial document is
//! returned.

use crate::config::ConversionConfig;
use crate::error::{Pdf2MdError, SourceError};
use crate::output::{ConversionResult, ConversionStats, PageResult};
use crate::page::PageContent;
use crate::pipeline::extract::{self, ExtractedDocument};
use crate::pipeline::images::ImageRegistry;
use crate::pipeline::page::process_page;
use crate::pipeline::serialize::render_document;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Lay out a sequence of pages supplied by any page source.
///
/// Pages are numbered by position (the first item is page 1) for error
/// reporting and page selection. Pages are processed strictly in order.
///
/// # Example
/// ```rust
/// use pdf_layout_md::{convert_pages, ConversionConfig, PageContent, TextRun};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), pdf_layout_md::Pdf2MdError> {
/// let page = PageContent::new(1, 612.0, 792.0)
///     .with_runs([TextRun::at("Hello", 72.0, 400.0, 12.0)]);
/// let result = convert_pages([Ok(page)], &ConversionConfig::default()).await?;
/// assert_eq!(result.markdown, "Hello\n\n");
/// # Ok(())
/// # }
/// ```
pub async fn convert_pages<I>(
    pages: I,
    config: &ConversionConfig,
) -> Result<ConversionResult, Pdf2MdError>
where
    I: IntoIterator<Item = Result<PageContent, SourceError>>,
{
    let pages: Vec<_> = pages.into_iter().collect();
    let total_pages = pages.len();

    let indices = config.pages.to_indices(total_pages);
    if total_pages > 0 && indices.is_empty() {
        return Err(Pdf2MdError::PageOutOfRange {
            page: config.pages.first_page(),
            total: total_pages,
        });
    }

    let numbered = pages
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| indices.binary_search(idx).is_ok())
        .map(|(idx, page)| (idx + 1, page))
        .collect();

    let document = ExtractedDocument {
        total_pages,
        pages: numbered,
    };
    convert_document(document, config).await
}

/// Convert a PDF file to Markdown.
///
/// # Errors
/// Returns `Err(Pdf2MdError)` for fatal errors only:
/// - File not found / permission denied / not a PDF
/// - Encrypted PDF without (or with the wrong) password
/// - A selected page that pdfium cannot read
pub async fn convert(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionResult, Pdf2MdError> {
    let pdf_path = pdf_path.as_ref();
    info!("Starting conversion: {}", pdf_path.display());
    let document = extract::load_pages(pdf_path, config).await?;
    convert_document(document, config).await
}

/// Convert PDF bytes in memory to Markdown.
///
/// This is the recommended API when PDF data comes from a database, network
/// stream, or in-memory buffer rather than a file on disk.
///
/// # Example
/// ```rust,no_run
/// use pdf_layout_md::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("document.pdf")?;
/// let output = convert_from_bytes(&bytes, &ConversionConfig::default()).await?;
/// println!("{}", output.markdown);
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionResult, Pdf2MdError> {
    let document = extract::load_pages_from_bytes(bytes.to_vec(), config).await?;
    convert_document(document, config).await
}

/// Convert a PDF and write the Markdown directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Pdf2MdError> {
    let output = convert(pdf_path, config).await?;
    write_markdown(output_path.as_ref(), &output.markdown).await?;
    Ok(output.stats)
}

/// Write `markdown` to `path` via a sibling temp file and a rename.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), Pdf2MdError> {
    let write_err = |e| Pdf2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {} bytes to {}", markdown.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionResult, Pdf2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(pdf_path, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn convert_document(
    document: ExtractedDocument,
    config: &ConversionConfig,
) -> Result<ConversionResult, Pdf2MdError> {
    let total_start = Instant::now();
    let selected = document.pages.len();
    let mut registry = ImageRegistry::new();
    let mut pages: Vec<PageResult> = Vec::with_capacity(selected);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    for (page_num, page) in document.pages {
        let page = page.map_err(|e| e.at_page(page_num))?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, selected);
        }
        let result = process_page(page_num, &page, &page.images, &mut registry, config).await;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page_num, selected, result.markdown.len());
        }
        pages.push(result);
    }

    let markdown = render_document(
        pages.iter().map(|p| (p.page_num, p.markdown.as_str())),
        &config.page_separator,
    );

    let stats = ConversionStats {
        total_pages: document.total_pages,
        processed_pages: pages.len(),
        empty_pages: pages.iter().filter(|p| p.is_empty()).count(),
        total_images: registry.len(),
        skipped_images: pages.iter().map(|p| p.skipped_images).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {}/{} pages, {} images, {}ms total",
        stats.processed_pages, stats.total_pages, stats.total_images, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected, stats.processed_pages - stats.empty_pages);
    }

    Ok(ConversionResult {
        markdown,
        images: registry.into_resources(),
        pages,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_markdown_is_atomic_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.md");
        write_markdown(&path, "# Title\n\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title\n\n");
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[tokio::test]
    async fn missing_input_is_fatal() {
        let err = convert("/no/such/file.pdf", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2MdError::FileNotFound { .. }));
    }
}
