//! PDF page source backed by pdfium.
//!
//! Turns each selected page of a PDF into a [`PageContent`]: text objects
//! become [`TextRun`]s, image objects become a `q cm Do Q` operator group
//! whose bitmap is stored in the page's resource map. Form XObjects are
//! walked recursively: their children are wrapped in the form's own `q cm
//! ... Q`, and nested text runs are mapped through the form matrix.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! All pdfium work happens on the blocking pool; only owned `PageContent`
//! values come back to the async side.
//!
//! ## Binding
//!
//! `PDFIUM_LIB_PATH` (a directory) is tried first, then the working
//! directory, then the system library search path.

use crate::config::ConversionConfig;
use crate::error::{Pdf2MdError, SourceError};
use crate::page::{ImageHandle, Matrix, Operator, PageContent, TextRun};
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Pages extracted from one document, in selection order.
#[derive(Debug)]
pub struct ExtractedDocument {
    pub total_pages: usize,
    /// `(1-based page number, page or the reason it could not be read)`.
    pub pages: Vec<(usize, Result<PageContent, SourceError>)>,
}

/// Check that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_input(path: &Path) -> Result<(), Pdf2MdError> {
    let path_buf = path.to_path_buf();
    if !path.exists() {
        return Err(Pdf2MdError::FileNotFound { path: path_buf });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2MdError::NotAPdf {
                    path: path_buf,
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2MdError::PermissionDenied { path: path_buf });
        }
        Err(_) => return Err(Pdf2MdError::FileNotFound { path: path_buf }),
    }

    debug!("Validated PDF input: {}", path.display());
    Ok(())
}

/// Bind to a pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2MdError> {
    let from_env = std::env::var_os("PDFIUM_LIB_PATH").and_then(|dir| {
        let dir = PathBuf::from(dir);
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            .map_err(|e| warn!("PDFIUM_LIB_PATH={} could not be bound: {:?}", dir.display(), e))
            .ok()
    });

    let bindings = match from_env {
        Some(bindings) => bindings,
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Pdf2MdError::PdfiumBindingFailed(format!("{e:?}")))?,
    };

    Ok(Pdfium::new(bindings))
}

/// Load the selected pages of a PDF file.
pub async fn load_pages(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<ExtractedDocument, Pdf2MdError> {
    validate_input(pdf_path)?;
    let path = pdf_path.to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(&path, config.password.as_deref())
            .map_err(|e| load_error(&path, config.password.is_some(), e))?;
        extract_document(&document, &config)
    })
    .await
    .map_err(|e| Pdf2MdError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Load the selected pages of an in-memory PDF.
pub async fn load_pages_from_bytes(
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<ExtractedDocument, Pdf2MdError> {
    let path = PathBuf::from("<memory>");
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Pdf2MdError::NotAPdf { path, magic });
    }
    let config = config.clone();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_vec(bytes, config.password.as_deref())
            .map_err(|e| load_error(&path, config.password.is_some(), e))?;
        extract_document(&document, &config)
    })
    .await
    .map_err(|e| Pdf2MdError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn load_error(path: &Path, had_password: bool, e: PdfiumError) -> Pdf2MdError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            Pdf2MdError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2MdError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2MdError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

fn extract_document(
    document: &PdfDocument<'_>,
    config: &ConversionConfig,
) -> Result<ExtractedDocument, Pdf2MdError> {
    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() {
        return Err(Pdf2MdError::PageOutOfRange {
            page: config.pages.first_page(),
            total: total_pages,
        });
    }

    let mut out = Vec::with_capacity(indices.len());
    for idx in indices {
        let page_num = idx + 1;
        let content = pages
            .get(idx as u16)
            .map_err(|e| SourceError::new(format!("{:?}", e)))
            .map(|page| extract_page(page_num, &page));
        if let Err(ref e) = content {
            warn!("Page {} could not be read: {}", page_num, e);
        }
        out.push((page_num, content));
    }

    Ok(ExtractedDocument {
        total_pages,
        pages: out,
    })
}

fn to_matrix(m: &PdfMatrix) -> Matrix {
    Matrix::new(m.a(), m.b(), m.c(), m.d(), m.e(), m.f())
}

/// Form XObjects nested deeper than this are skipped.
const MAX_FORM_DEPTH: usize = 8;

/// Place a text object in page space.
///
/// `ctm` maps the enclosing form (identity at page level) to the page;
/// `object` is the text object's own matrix. The run's transform maps a
/// unit glyph box, so it carries the unscaled font size. Height and width
/// are measured in the form's space and are scaled out to the page.
fn place_text_run(
    text: String,
    ctm: &Matrix,
    object: &Matrix,
    unscaled_size: f32,
    scaled_size: Option<f32>,
    width: Option<f32>,
) -> TextRun {
    let size = if unscaled_size > 0.0 { unscaled_size } else { 1.0 };
    let transform = ctm.multiply(object).multiply(&Matrix::scale(size, size));
    let x_scale = ctm.a.hypot(ctm.b);
    let y_scale = ctm.c.hypot(ctm.d);

    let mut run = TextRun::new(text, transform);
    if let Some(h) = scaled_size.filter(|h| *h > 0.0) {
        run = run.with_height(h * y_scale);
    }
    if let Some(w) = width {
        run = run.with_width(w * x_scale);
    }
    run
}

/// Collects one page's runs and operators while walking its object tree.
struct PageWalker {
    page_num: usize,
    runs: Vec<TextRun>,
    operators: Vec<Operator>,
    images: Vec<(String, ImageHandle)>,
}

impl PageWalker {
    fn walk<'a>(
        &mut self,
        objects: impl Iterator<Item = PdfPageObject<'a>>,
        ctm: Matrix,
        depth: usize,
    ) {
        for object in objects {
            let matrix = match object.matrix() {
                Ok(m) => to_matrix(&m),
                Err(e) => {
                    debug!("Page {}: object has no matrix: {:?}", self.page_num, e);
                    continue;
                }
            };

            if let Some(text) = object.as_text_object() {
                self.runs.push(place_text_run(
                    text.text(),
                    &ctm,
                    &matrix,
                    text.unscaled_font_size().value,
                    Some(text.scaled_font_size().value),
                    object.width().ok().map(|w| w.value),
                ));
            } else if let Some(image) = object.as_image_object() {
                match image.get_raw_image() {
                    Ok(bitmap) => {
                        let name = format!("obj{}", self.images.len());
                        self.operators.extend([
                            Operator::Save,
                            Operator::Transform(matrix),
                            Operator::PaintImage(name.clone()),
                            Operator::Restore,
                        ]);
                        self.images.push((name, ImageHandle::Decoded(bitmap)));
                    }
                    Err(e) => {
                        warn!("Page {}: image object could not be read: {:?}", self.page_num, e);
                    }
                }
            } else if let Some(form) = object.as_x_object_form_object() {
                if depth >= MAX_FORM_DEPTH {
                    warn!("Page {}: form nested too deep, skipped", self.page_num);
                    continue;
                }
                self.operators.extend([Operator::Save, Operator::Transform(matrix)]);
                self.walk(form.iter(), ctm.multiply(&matrix), depth + 1);
                self.operators.push(Operator::Restore);
            } else {
                let kind = format!("{:?}", object.object_type());
                self.operators.push(Operator::Other(kind));
            }
        }
    }
}

/// Convert one pdfium page into owned page content.
fn extract_page(page_num: usize, page: &PdfPage<'_>) -> PageContent {
    let mut walker = PageWalker {
        page_num,
        runs: Vec::new(),
        operators: Vec::new(),
        images: Vec::new(),
    };
    walker.walk(page.objects().iter(), Matrix::IDENTITY, 0);

    debug!(
        "Page {}: extracted {} text runs, {} images",
        page_num,
        walker.runs.len(),
        walker.images.len()
    );
    let mut content = PageContent::new(page_num, page.width().value, page.height().value)
        .with_runs(walker.runs)
        .with_operators(walker.operators);
    for (name, handle) in walker.images {
        content = content.with_image(name, handle);
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_input(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, Pdf2MdError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected_by_magic() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"PK\x03\x04 not a pdf").unwrap();
        let err = validate_input(tmp.path()).unwrap_err();
        match err {
            Pdf2MdError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn pdf_magic_passes_validation() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7\n").unwrap();
        assert!(validate_input(tmp.path()).is_ok());
    }

    #[test]
    fn page_level_text_run_keeps_object_geometry() {
        let object = Matrix::new(1.0, 0.0, 0.0, 1.0, 72.0, 700.0);
        let run = place_text_run(
            "Title".into(),
            &Matrix::IDENTITY,
            &object,
            18.0,
            Some(18.0),
            Some(50.0),
        );
        assert_eq!(run.x(), 72.0);
        assert_eq!(run.y(), 700.0);
        assert_eq!(run.font_size(), 18.0);
        assert_eq!(run.right(), 122.0);
    }

    #[test]
    fn text_inside_form_is_mapped_to_page_space() {
        // A form drawn at half size, offset to (100, 400).
        let form = Matrix::new(0.5, 0.0, 0.0, 0.5, 100.0, 400.0);
        let object = Matrix::new(1.0, 0.0, 0.0, 1.0, 20.0, 40.0);
        let run = place_text_run(
            "inside".into(),
            &form,
            &object,
            24.0,
            Some(24.0),
            Some(60.0),
        );
        assert_eq!(run.x(), 110.0);
        assert_eq!(run.y(), 420.0);
        assert_eq!(run.font_size(), 12.0);
        assert_eq!(run.right(), 140.0);
    }

    #[test]
    fn image_inside_form_group_composes_with_form_matrix() {
        use crate::page::{ColorSpace, RawImage};
        use crate::pipeline::transform::track_images;
        use std::collections::HashMap;

        let ops = vec![
            Operator::Save,
            Operator::Transform(Matrix::new(0.5, 0.0, 0.0, 0.5, 100.0, 400.0)),
            Operator::Save,
            Operator::Transform(Matrix::new(200.0, 0.0, 0.0, 100.0, 0.0, 0.0)),
            Operator::PaintImage("obj0".into()),
            Operator::Restore,
            Operator::Restore,
        ];
        let mut resources = HashMap::new();
        resources.insert(
            "obj0".to_string(),
            ImageHandle::Raw(RawImage {
                width: 1,
                height: 1,
                samples: vec![0],
                color_space: ColorSpace::Gray,
            }),
        );
        let tracked = track_images(1, &ops, &resources);
        assert_eq!(tracked.painted.len(), 1);
        assert_eq!(tracked.painted[0].placement.visual_top, 450.0);
    }

    #[tokio::test]
    async fn bytes_without_magic_are_rejected_before_binding() {
        let err = load_pages_from_bytes(b"<html>".to_vec(), &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2MdError::NotAPdf { .. }));
    }
}
