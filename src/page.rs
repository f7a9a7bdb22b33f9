//! Page-level input model: what a document source hands to the layout engine.
//!
//! A page is a soup of positioned text runs plus an operator stream that
//! paints images. Nothing here carries structure; recovering paragraphs,
//! headings and reading order is the job of [`crate::pipeline`].
//!
//! All coordinates are in page space: origin at the bottom-left corner,
//! y increasing upward.

use crate::error::ImageError;
use image::DynamicImage;
use std::collections::HashMap;

/// Font size assumed when a run carries neither a height nor a usable
/// vertical scale, and the base size of a page without text.
pub const DEFAULT_FONT_SIZE: f32 = 10.0;

// ── Geometry ─────────────────────────────────────────────────────────────

/// A 2×3 affine transform `[a b c d e f]`, as found in PDF content streams.
///
/// Maps `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Compose `self ∘ other`: `other` is applied first, then `self`.
    ///
    /// This is how a `cm` operator updates the current transform.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Largest y of the unit square's corners under this transform.
    pub fn unit_square_top(&self) -> f32 {
        [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)]
            .iter()
            .map(|&(x, y)| self.apply(x, y).1)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

impl From<[f32; 6]> for Matrix {
    fn from(m: [f32; 6]) -> Self {
        Matrix::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }
}

// ── Text ─────────────────────────────────────────────────────────────────

/// A positioned run of text, as produced by the text-content source.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub content: String,
    /// Text-space to page-space transform; `(e, f)` is the baseline origin.
    pub transform: Matrix,
    /// Glyph height in page units, when the source knows it.
    pub height: Option<f32>,
    /// Horizontal advance in page units, when the source knows it.
    pub width: Option<f32>,
}

impl TextRun {
    pub fn new(content: impl Into<String>, transform: Matrix) -> Self {
        Self {
            content: content.into(),
            transform,
            height: None,
            width: None,
        }
    }

    /// Convenience constructor for an unrotated run of the given size at a
    /// baseline position.
    pub fn at(content: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        Self::new(content, Matrix::new(font_size, 0.0, 0.0, font_size, x, y))
            .with_height(font_size)
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn x(&self) -> f32 {
        self.transform.e
    }

    pub fn y(&self) -> f32 {
        self.transform.f
    }

    /// Run height, falling back to the transform's vertical scale, then
    /// to [`DEFAULT_FONT_SIZE`].
    pub fn font_size(&self) -> f32 {
        match self.height {
            Some(h) if h > 0.0 => h,
            _ if self.transform.d.abs() > 0.0 => self.transform.d.abs(),
            _ => DEFAULT_FONT_SIZE,
        }
    }

    /// Advance width; estimated at half an em per character when the
    /// source did not report one.
    pub fn advance(&self) -> f32 {
        match self.width {
            Some(w) if w >= 0.0 => w,
            _ => self.content.chars().count() as f32 * self.font_size() * 0.5,
        }
    }

    pub fn right(&self) -> f32 {
        self.x() + self.advance()
    }
}

// ── Images ───────────────────────────────────────────────────────────────

/// Colour space tag attached to raw image samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Rgba,
    Cmyk,
    /// Source did not say; the channel count is inferred from the buffer.
    Unknown,
}

/// Undecoded 8-bit samples plus the shape needed to interpret them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<u8>,
    pub color_space: ColorSpace,
}

impl RawImage {
    /// Samples per pixel implied by the buffer length, or `None` if the
    /// buffer is not a whole multiple of the pixel count.
    pub fn channels(&self) -> Option<usize> {
        let pixels = self.width as usize * self.height as usize;
        if pixels == 0 || self.samples.len() % pixels != 0 {
            return None;
        }
        Some(self.samples.len() / pixels)
    }
}

/// An image resource as handed over by the raster decoder.
#[derive(Debug, Clone)]
pub enum ImageHandle {
    /// Already a drawable bitmap.
    Decoded(DynamicImage),
    /// Raw samples that still need colour-space conversion.
    Raw(RawImage),
}

impl ImageHandle {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageHandle::Decoded(img) => (img.width(), img.height()),
            ImageHandle::Raw(raw) => (raw.width, raw.height),
        }
    }
}

/// Resolves a named image resource (an XObject name) to its pixels.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<ImageHandle, ImageError>;
}

impl ImageResolver for HashMap<String, ImageHandle> {
    fn resolve(&self, name: &str) -> Result<ImageHandle, ImageError> {
        self.get(name).cloned().ok_or_else(|| ImageError::Unresolved {
            name: name.to_string(),
            detail: "no such image resource on this page".into(),
        })
    }
}

// ── Operators ────────────────────────────────────────────────────────────

/// The subset of content-stream operators the layout engine cares about.
#[derive(Debug, Clone)]
pub enum Operator {
    /// `q`
    Save,
    /// `Q`
    Restore,
    /// `cm`
    Transform(Matrix),
    /// `Do` on an image XObject.
    PaintImage(String),
    /// `BI … ID … EI`
    PaintInlineImage(ImageHandle),
    /// Anything else; ignored.
    Other(String),
}

// ── Page ─────────────────────────────────────────────────────────────────

/// Everything the engine needs to lay out one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// 1-indexed page number as reported by the source. Conversion numbers
    /// pages by their position in the document and does not rely on this.
    pub number: usize,
    pub width: f32,
    pub height: f32,
    pub text_runs: Vec<TextRun>,
    pub operators: Vec<Operator>,
    /// Named image resources referenced by [`Operator::PaintImage`].
    pub images: HashMap<String, ImageHandle>,
}

impl PageContent {
    pub fn new(number: usize, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_runs(mut self, runs: impl IntoIterator<Item = TextRun>) -> Self {
        self.text_runs.extend(runs);
        self
    }

    pub fn with_operators(mut self, ops: impl IntoIterator<Item = Operator>) -> Self {
        self.operators.extend(ops);
        self
    }

    pub fn with_image(mut self, name: impl Into<String>, handle: ImageHandle) -> Self {
        self.images.insert(name.into(), handle);
        self
    }
}
