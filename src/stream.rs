//! Streaming conversion API: emit pages as they are laid out.
//!
//! ## Why stream?
//!
//! Long documents with many images take a while to materialize. A
//! stream-based API lets callers display partial results immediately, wire
//! up progress bars, or write pages to disk incrementally.
//!
//! Pages are laid out one at a time, so items arrive in page order. A page
//! source error ends the stream after yielding it; dropping the stream stops
//! work at the next page boundary.

use crate::config::ConversionConfig;
use crate::error::{Pdf2MdError, SourceError};
use crate::output::PageResult;
use crate::page::PageContent;
use crate::pipeline::extract;
use crate::pipeline::images::ImageRegistry;
use crate::pipeline::page::process_page;
use futures::stream;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, Pdf2MdError>> + Send>>;

/// Document image table shared between a stream and its caller.
pub type SharedRegistry = Arc<Mutex<ImageRegistry>>;

/// Lay out pages from any page source, yielding each page's result in order.
///
/// Items are numbered by position, as in [`crate::convert::convert_pages`].
/// `config.pages` is not applied here: the source is consumed lazily, so
/// feed it only the pages to convert.
pub fn convert_stream<I>(pages: I, config: &ConversionConfig) -> PageStream
where
    I: IntoIterator<Item = Result<PageContent, SourceError>>,
    I::IntoIter: Send + 'static,
{
    let numbered = pages.into_iter().enumerate().map(|(i, p)| (i + 1, p));
    convert_stream_with_registry(numbered, config, Arc::new(Mutex::new(ImageRegistry::new())))
}

/// Like [`convert_stream`], but registers images into `registry` so the
/// caller can read the document's image table once the stream is drained.
///
/// `pages` yields `(1-based page number, page)`.
pub fn convert_stream_with_registry<I>(
    pages: I,
    config: &ConversionConfig,
    registry: SharedRegistry,
) -> PageStream
where
    I: Iterator<Item = (usize, Result<PageContent, SourceError>)> + Send + 'static,
{
    let state = StreamState {
        pages,
        config: config.clone(),
        registry,
        done: false,
    };

    let s = stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        let (page_num, page) = state.pages.next()?;
        let item = match page {
            Ok(page) => {
                let mut registry = state.registry.lock().await;
                Ok(process_page(page_num, &page, &page.images, &mut registry, &state.config).await)
            }
            Err(e) => {
                state.done = true;
                Err(e.at_page(page_num))
            }
        };
        Some((item, state))
    });

    Box::pin(s)
}

/// Extract a PDF with pdfium and stream its selected pages.
///
/// Extraction happens up front; layout happens as the stream is polled.
pub async fn convert_file_stream(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<(PageStream, SharedRegistry), Pdf2MdError> {
    let pdf_path = pdf_path.as_ref();
    info!("Starting streaming conversion: {}", pdf_path.display());
    let document = extract::load_pages(pdf_path, config).await?;
    let registry: SharedRegistry = Arc::new(Mutex::new(ImageRegistry::new()));
    let stream = convert_stream_with_registry(
        document.pages.into_iter(),
        config,
        Arc::clone(&registry),
    );
    Ok((stream, registry))
}

struct StreamState<I> {
    pages: I,
    config: ConversionConfig,
    registry: SharedRegistry,
    done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::TextRun;
    use futures::StreamExt;

    fn page(n: usize, text: &str) -> Result<PageContent, SourceError> {
        Ok(PageContent::new(n, 612.0, 792.0).with_runs([TextRun::at(text, 72.0, 400.0, 12.0)]))
    }

    #[tokio::test]
    async fn pages_arrive_in_order() {
        let pages = vec![page(1, "one"), page(2, "two"), page(3, "three")];
        let results: Vec<_> = convert_stream(pages, &ConversionConfig::default())
            .collect()
            .await;
        let nums: Vec<usize> = results
            .iter()
            .map(|r| r.as_ref().unwrap().page_num)
            .collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn source_error_ends_stream() {
        let pages = vec![
            page(1, "one"),
            Err(SourceError::new("bad xref")),
            page(3, "three"),
        ];
        let results: Vec<_> = convert_stream(pages, &ConversionConfig::default())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        match &results[1] {
            Err(Pdf2MdError::PageSource { page, .. }) => assert_eq!(*page, 2),
            other => panic!("expected page source error, got {other:?}"),
        }
    }
}
