//! # pdf-layout-md
//!
//! Reconstruct the reading order and structure of PDF pages and emit
//! Markdown: headings, paragraphs and inline images.
//!
//! ## Why this crate?
//!
//! A PDF page is a bag of positioned glyph runs and painted bitmaps with no
//! notion of "line", "paragraph" or "heading". Dumping the text in content
//! stream order gives running heads mixed into body text, columns of words
//! in the wrong order and figures lost entirely. This crate rebuilds the
//! layout geometrically from positions and font sizes alone, deterministically
//! and without any model in the loop.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract    pdfium → text runs + image operators (spawn_blocking)
//!  ├─ 2. Fonts      dominant body font size per page
//!  ├─ 3. Images     replay the CTM, encode PNG, register resources
//!  ├─ 4. Filter     drop running heads, page numbers, unrenderable runs
//!  ├─ 5. Lines      cluster runs by y, interleave images, sort top to bottom
//!  ├─ 6. Classify   assemble strings, H1/H2/H3 by font-size ratio
//!  ├─ 7. Paragraph  merge body lines (CJK-aware joins)
//!  └─ 8. Serialize  Markdown fragments, concatenated in page order
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_layout_md::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .images_dir("out/images", "images")
//!         .build()?;
//!     let output = convert("document.pdf", &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("{} images", output.stats.total_images);
//!     Ok(())
//! }
//! ```
//!
//! Any other page source can feed [`convert_pages`] with [`PageContent`]
//! values built from its own text runs and operators.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf-layout-md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ImageOutput, LayoutConfig, PageSelection,
    PageSeparator,
};
pub use convert::{convert, convert_from_bytes, convert_pages, convert_sync, convert_to_file};
pub use error::{ImageError, Pdf2MdError, SourceError};
pub use output::{ConversionResult, ConversionStats, ImageResource, PageResult};
pub use page::{
    ColorSpace, ImageHandle, ImageResolver, Matrix, Operator, PageContent, RawImage, TextRun,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use pipeline::images::ImageRegistry;
pub use stream::{
    convert_file_stream, convert_stream, convert_stream_with_registry, PageStream, SharedRegistry,
};
