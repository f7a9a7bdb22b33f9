//! Error types for the pdf-layout-md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2MdError`] is **fatal**: the conversion cannot proceed at all
//!   (bad input file, wrong password, a page source that breaks mid-document).
//!   Returned as `Err(Pdf2MdError)` from the top-level `convert*` functions.
//!   There is no partial result: a document whose page 7 cannot be read is
//!   reported as a failure at page 7, never as a shorter document.
//!
//! * [`ImageError`] is **non-fatal**: a single image could not be resolved,
//!   decoded or stored. The image is left out of the page, the page carries
//!   on, and the failure is counted in [`crate::output::PageResult`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-layout-md library.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The page source could not produce a page's operators or text runs.
    #[error("Failed to read page {page}: {detail}")]
    PageSource { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, or set PDFIUM_LIB_PATH to the directory\n\
containing an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single image. Never aborts the page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// A named resource was painted but the resolver does not know it.
    #[error("image '{name}' could not be resolved: {detail}")]
    Unresolved { name: String, detail: String },

    /// Pixel data could not be turned into an RGBA raster.
    #[error("image '{id}' could not be decoded: {detail}")]
    Decode { id: String, detail: String },

    /// The raster could not be encoded or stored as a resource.
    #[error("image '{id}' could not be stored: {detail}")]
    Store { id: String, detail: String },
}

impl ImageError {
    /// The resource name or placement identifier the error is about.
    pub fn id(&self) -> &str {
        match self {
            ImageError::Unresolved { name, .. } => name,
            ImageError::Decode { id, .. } | ImageError::Store { id, .. } => id,
        }
    }
}

/// A document source's error for one page, before the engine attaches the
/// page number to it.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }

    pub(crate) fn at_page(self, page: usize) -> Pdf2MdError {
        Pdf2MdError::PageSource {
            page,
            detail: self.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_source_display_names_page() {
        let e = SourceError::new("truncated content stream").at_page(7);
        let msg = e.to_string();
        assert!(msg.contains("page 7"), "got: {msg}");
        assert!(msg.contains("truncated content stream"));
    }

    #[test]
    fn image_error_display() {
        let e = ImageError::Decode {
            id: "img_p2_14".into(),
            detail: "zero-sized image".into(),
        };
        assert!(e.to_string().contains("img_p2_14"));
        assert!(e.to_string().contains("zero-sized"));
    }

    #[test]
    fn page_out_of_range_display() {
        let e = Pdf2MdError::PageOutOfRange { page: 9, total: 4 };
        assert!(e.to_string().contains("4 pages"));
    }
}
