//! Image materialization: pixels → RGBA → PNG → registered resource.
//!
//! Sources hand over either a decoded bitmap or raw 8-bit samples with a
//! colour-space tag. Everything is normalised to RGBA, PNG-encoded (lossless,
//! so line art and scanned text stay crisp) and registered under the
//! placement's identifier. The handle is a base64 `data:` URI or a file
//! written next to the Markdown, depending on [`ImageOutput`].
//!
//! Encoding is CPU-bound and runs in `spawn_blocking`; callers await each
//! image in placement order so identifiers are assigned deterministically.

use crate::config::ImageOutput;
use crate::error::ImageError;
use crate::output::ImageResource;
use crate::page::{ColorSpace, ImageHandle, RawImage};
use crate::pipeline::transform::{ImagePlacement, PaintedImage};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use std::collections::HashSet;
use std::io::Cursor;
use tracing::debug;

/// An image that made it onto the page: where it sits and what to link to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    pub placement: ImagePlacement,
    pub resource: ImageResource,
}

/// Append-only table of registered images, in first-seen order.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    resources: Vec<ImageResource>,
    ids: HashSet<String>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resource. Identifiers must be unique across the document.
    pub fn register(&mut self, resource: ImageResource) -> Result<(), ImageError> {
        if !self.ids.insert(resource.id.clone()) {
            return Err(ImageError::Store {
                id: resource.id,
                detail: "identifier already registered".into(),
            });
        }
        self.resources.push(resource);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[ImageResource] {
        &self.resources
    }

    pub fn into_resources(self) -> Vec<ImageResource> {
        self.resources
    }
}

/// Decode, encode and store one painted image, returning its resource.
///
/// Nothing is written or registered unless every step succeeds.
pub async fn materialize(
    painted: PaintedImage,
    output: &ImageOutput,
) -> Result<ImageResource, ImageError> {
    let id = painted.placement.id.clone();
    let source = painted.source;

    let task_id = id.clone();
    let png = tokio::task::spawn_blocking(move || {
        let rgba = to_rgba(&task_id, source)?;
        encode_png(&task_id, &rgba)
    })
    .await
    .map_err(|e| ImageError::Store {
        id: id.clone(),
        detail: format!("encode task panicked: {e}"),
    })??;

    let url = match output {
        ImageOutput::Embed => data_uri(&png),
        ImageOutput::Directory { dir, url_prefix } => {
            let file_name = format!("{id}.png");
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| store_error(&id, e))?;
            tokio::fs::write(dir.join(&file_name), &png)
                .await
                .map_err(|e| store_error(&id, e))?;
            let prefix = url_prefix.trim_end_matches('/');
            if prefix.is_empty() {
                file_name
            } else {
                format!("{prefix}/{file_name}")
            }
        }
        ImageOutput::Omit => {
            return Err(ImageError::Store {
                id,
                detail: "image output is disabled".into(),
            })
        }
    };

    debug!("Materialized {} → {} bytes PNG", id, png.len());
    Ok(ImageResource { id, url })
}

fn store_error(id: &str, e: std::io::Error) -> ImageError {
    ImageError::Store {
        id: id.to_string(),
        detail: e.to_string(),
    }
}

/// Wrap PNG bytes as a `data:image/png;base64,…` URI.
pub fn data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Encode an RGBA raster as PNG.
pub fn encode_png(id: &str, img: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ImageError::Store {
            id: id.to_string(),
            detail: format!("PNG encoding failed: {e}"),
        })?;
    Ok(buf)
}

/// Normalise any image handle to an RGBA raster.
pub fn to_rgba(id: &str, handle: ImageHandle) -> Result<RgbaImage, ImageError> {
    let (width, height) = handle.dimensions();
    if width == 0 || height == 0 {
        return Err(decode_error(id, format!("zero-sized image {width}x{height}")));
    }
    match handle {
        ImageHandle::Decoded(img) => Ok(img.to_rgba8()),
        ImageHandle::Raw(raw) => raw_to_rgba(id, raw),
    }
}

fn raw_to_rgba(id: &str, raw: RawImage) -> Result<RgbaImage, ImageError> {
    let pixels = raw.width as usize * raw.height as usize;
    let s = &raw.samples;

    let rgba: Vec<u8> = match (raw.channels(), raw.color_space) {
        (Some(1), _) => s.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        (Some(3), _) => s
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        (Some(4), ColorSpace::Cmyk) => s
            .chunks_exact(4)
            .flat_map(|p| {
                let k = 1.0 - p[3] as f32 / 255.0;
                let ch = |v: u8| (255.0 * (1.0 - v as f32 / 255.0) * k).round() as u8;
                [ch(p[0]), ch(p[1]), ch(p[2]), 255]
            })
            .collect(),
        (Some(4), _) => s.clone(),
        _ if s.len() >= pixels * 4 => s[..pixels * 4].to_vec(),
        _ => (0..pixels)
            .flat_map(|i| {
                let g = s.get(i).copied().unwrap_or(0);
                [g, g, g, 255]
            })
            .collect(),
    };

    RgbaImage::from_raw(raw.width, raw.height, rgba)
        .ok_or_else(|| decode_error(id, "sample buffer does not match dimensions".into()))
}

fn decode_error(id: &str, detail: String) -> ImageError {
    ImageError::Decode {
        id: id.to_string(),
        detail,
    }
}
