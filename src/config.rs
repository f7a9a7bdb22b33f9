//! Configuration types for PDF-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The geometric thresholds of the layout
//! engine live in [`LayoutConfig`]; one value is shared by every page of a
//! conversion, so a document is never laid out with two sets of constants.

use crate::error::Pdf2MdError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for a PDF-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_layout_md::{ConversionConfig, PageSelection};
///
/// let config = ConversionConfig::builder()
///     .pages(PageSelection::Range(1, 3))
///     .images_dir("out/images", "images")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Default)]
pub struct ConversionConfig {
    /// Layout thresholds. Default: [`LayoutConfig::default()`].
    pub layout: LayoutConfig,

    /// Where materialized images go. Default: embedded data URIs.
    pub image_output: ImageOutput,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Page separator in assembled output. Default: None.
    pub page_separator: PageSeparator,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("layout", &self.layout)
            .field("image_output", &self.image_output)
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn image_output(mut self, output: ImageOutput) -> Self {
        self.config.image_output = output;
        self
    }

    /// Write images as PNG files into `dir`, referenced from the Markdown as
    /// `{url_prefix}/{id}.png`.
    pub fn images_dir(mut self, dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        self.config.image_output = ImageOutput::Directory {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        };
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2MdError> {
        self.config.layout.validate()?;
        if let PageSelection::Range(start, end) = self.config.pages {
            if start == 0 || start > end {
                return Err(Pdf2MdError::InvalidConfig(format!(
                    "Page range {start}-{end} is invalid (pages are 1-indexed, start ≤ end)"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Layout thresholds ────────────────────────────────────────────────────

/// Geometric and statistical thresholds of the layout engine, in page units
/// unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Two runs whose visual tops differ by less than this share a line.
    pub line_tolerance: f32,
    /// Height of the header band measured down from the page top.
    pub header_height: f32,
    /// Height of the footer band measured up from the page bottom.
    pub footer_height: f32,
    /// Images whose visual top is this close to the top or bottom edge are dropped.
    pub image_edge_margin: f32,
    /// Fraction of the font size added to the baseline to approximate cap height.
    pub cap_height_ratio: f32,
    /// Header/footer runs smaller than this fraction of the base size are dropped.
    pub small_font_ratio: f32,
    /// A gap wider than this fraction of the font size becomes a space.
    pub space_gap_ratio: f32,
    /// A line narrower than this fraction of the widest line ends its paragraph.
    pub paragraph_width_ratio: f32,
    /// Size-to-base ratios for heading levels 1, 2 and 3.
    pub heading_ratios: [f32; 3],
    /// Lines within this many units of the base size are never headings.
    pub heading_min_delta: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 4.0,
            header_height: 70.0,
            footer_height: 70.0,
            image_edge_margin: 20.0,
            cap_height_ratio: 0.8,
            small_font_ratio: 0.9,
            space_gap_ratio: 0.25,
            paragraph_width_ratio: 0.85,
            heading_ratios: [1.8, 1.4, 1.15],
            heading_min_delta: 1.0,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), Pdf2MdError> {
        let non_negative = [
            ("line_tolerance", self.line_tolerance),
            ("header_height", self.header_height),
            ("footer_height", self.footer_height),
            ("image_edge_margin", self.image_edge_margin),
            ("space_gap_ratio", self.space_gap_ratio),
            ("paragraph_width_ratio", self.paragraph_width_ratio),
            ("heading_min_delta", self.heading_min_delta),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Pdf2MdError::InvalidConfig(format!(
                    "{name} must be a finite value ≥ 0, got {value}"
                )));
            }
        }
        let [h1, h2, h3] = self.heading_ratios;
        if !(h1 >= h2 && h2 >= h3 && h3 > 1.0) {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "heading ratios must be descending and > 1, got {:?}",
                self.heading_ratios
            )));
        }
        Ok(())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where materialized images are registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ImageOutput {
    /// Embed each image as a base64 `data:image/png` URI. (default)
    #[default]
    Embed,
    /// Write `{id}.png` into `dir`; the handle is `{url_prefix}/{id}.png`.
    Directory { dir: PathBuf, url_prefix: String },
    /// Do not materialize images at all; image lines are dropped.
    Omit,
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) if (1..=total_pages).contains(p) => vec![p - 1],
            PageSelection::Single(_) => vec![],
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The lowest page number the selection asks for, used in range errors.
    pub fn first_page(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(1),
        }
    }
}

/// How to separate pages in the assembled Markdown output.
///
/// Every page fragment already ends with a blank line, so the default
/// inserts nothing extra.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Fragments are concatenated as-is. (default)
    #[default]
    None,
    /// Horizontal rule block: "---"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom block inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator block placed before the given page (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => String::new(),
            PageSeparator::HorizontalRule => "---\n\n".to_string(),
            PageSeparator::Comment => format!("<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("{}\n\n", s),
        }
    }
}
