//! Pipeline stages for PDF-page layout reconstruction.
//!
//! Each submodule implements exactly one transformation step. Stages are
//! plain functions over owned or borrowed page data, so each one is
//! independently testable with synthetic runs and operators.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ fonts ──▶ filter ──▶ lines ──▶ classify ──▶ paragraph ──▶ serialize
//! (pdfium)      │                    ▲
//!               └─ transform ──▶ images
//!                  (CTM replay)  (PNG, registry)
//! ```
//!
//! 1. [`extract`] - turn pdfium pages into [`crate::page::PageContent`];
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 2. [`fonts`] - the page's dominant (body) font size
//! 3. [`transform`] - replay `q`/`Q`/`cm` to find where each image lands
//! 4. [`images`] - normalise pixels to RGBA, encode PNG, register
//! 5. [`filter`] - drop headers, footers and unrenderable runs
//! 6. [`lines`] - cluster runs into visual lines, sort top to bottom
//! 7. [`classify`] - assemble line strings, assign heading levels
//! 8. [`paragraph`] - merge body lines into paragraphs (CJK-aware)
//! 9. [`serialize`] - render blocks as Markdown
//!
//! [`page`] drives stages 2–9 for a single page.

pub mod classify;
pub mod extract;
pub mod filter;
pub mod fonts;
pub mod images;
pub mod lines;
pub mod page;
pub mod paragraph;
pub mod serialize;
pub mod transform;
