//! Transform tracking: replay the operator stream to place images.
//!
//! Images are painted into the unit square of the current transformation
//! matrix, so their on-page position is only known by replaying every
//! `q`/`Q`/`cm` that precedes the paint. The tracker keeps the CTM and its
//! save stack, and for each paint records where the image's top edge lands.

use crate::error::ImageError;
use crate::page::{ImageHandle, ImageResolver, Matrix, Operator};
use tracing::{debug, warn};

/// Where an image was painted on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    /// Unique within the document: `img_p{page}_{operator index}`.
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// The CTM at paint time.
    pub matrix: Matrix,
    /// Largest page-space y of the transformed unit square.
    pub visual_top: f32,
}

/// A placement together with the pixels it paints.
#[derive(Debug, Clone)]
pub struct PaintedImage {
    pub placement: ImagePlacement,
    pub source: ImageHandle,
}

/// Images found on a page, plus the ones that could not be resolved.
#[derive(Debug, Default)]
pub struct TrackedImages {
    pub painted: Vec<PaintedImage>,
    pub failures: Vec<ImageError>,
}

/// Identifier for the image painted by operator `op_index` on `page`.
pub fn placement_id(page: usize, op_index: usize) -> String {
    format!("img_p{page}_{op_index}")
}

/// Replay `operators` and collect every painted image in stream order.
///
/// An unresolvable named image is logged and skipped; it never aborts the
/// page. A `Restore` without a matching `Save` leaves the CTM unchanged.
pub fn track_images(
    page: usize,
    operators: &[Operator],
    resolver: &dyn ImageResolver,
) -> TrackedImages {
    let mut ctm = Matrix::IDENTITY;
    let mut stack: Vec<Matrix> = Vec::new();
    let mut out = TrackedImages::default();

    for (op_index, op) in operators.iter().enumerate() {
        let source = match op {
            Operator::Save => {
                stack.push(ctm);
                continue;
            }
            Operator::Restore => {
                if let Some(saved) = stack.pop() {
                    ctm = saved;
                }
                continue;
            }
            Operator::Transform(m) => {
                ctm = ctm.multiply(m);
                continue;
            }
            Operator::Other(_) => continue,
            Operator::PaintImage(name) => match resolver.resolve(name) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Page {}: skipping image '{}': {}", page, name, e);
                    out.failures.push(e);
                    continue;
                }
            },
            Operator::PaintInlineImage(handle) => handle.clone(),
        };

        let (width, height) = source.dimensions();
        let placement = ImagePlacement {
            id: placement_id(page, op_index),
            width,
            height,
            matrix: ctm,
            visual_top: ctm.unit_square_top(),
        };
        debug!(
            "Page {}: image {} ({}x{}) top at y={:.1}",
            page, placement.id, width, height, placement.visual_top
        );
        out.painted.push(PaintedImage { placement, source });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ColorSpace, RawImage};
    use std::collections::HashMap;

    fn gray(w: u32, h: u32) -> ImageHandle {
        ImageHandle::Raw(RawImage {
            width: w,
            height: h,
            samples: vec![128; (w * h) as usize],
            color_space: ColorSpace::Gray,
        })
    }

    fn resources() -> HashMap<String, ImageHandle> {
        HashMap::from([("Im1".to_string(), gray(4, 2))])
    }

    #[test]
    fn scaled_paint_uses_pre_scale_transform() {
        let ops = vec![
            Operator::Transform(Matrix::new(200.0, 0.0, 0.0, 200.0, 100.0, 200.0)),
            Operator::Save,
            Operator::Transform(Matrix::scale(0.5, 0.5)),
            Operator::PaintImage("Im1".into()),
            Operator::Restore,
            Operator::PaintImage("Im1".into()),
        ];
        let tracked = track_images(1, &ops, &resources());
        assert_eq!(tracked.painted.len(), 2);
        // 200 + 0.5 * 200, not 200 + 1 (identity) and not 200 + 200.
        assert_eq!(tracked.painted[0].placement.visual_top, 300.0);
        // After restore the pre-scale transform is back in force.
        assert_eq!(tracked.painted[1].placement.visual_top, 400.0);
    }

    #[test]
    fn duplicate_images_get_distinct_ids() {
        let ops = vec![
            Operator::PaintImage("Im1".into()),
            Operator::Other("re".into()),
            Operator::PaintImage("Im1".into()),
        ];
        let tracked = track_images(3, &ops, &resources());
        let ids: Vec<_> = tracked.painted.iter().map(|p| p.placement.id.as_str()).collect();
        assert_eq!(ids, vec!["img_p3_0", "img_p3_2"]);
        assert_eq!(tracked.painted[0].placement.width, 4);
    }

    #[test]
    fn unresolved_image_is_skipped() {
        let ops = vec![
            Operator::PaintImage("Missing".into()),
            Operator::PaintInlineImage(gray(1, 1)),
        ];
        let tracked = track_images(1, &ops, &resources());
        assert_eq!(tracked.painted.len(), 1);
        assert_eq!(tracked.failures.len(), 1);
        assert_eq!(tracked.painted[0].placement.id, "img_p1_1");
    }

    #[test]
    fn unbalanced_restore_is_ignored() {
        let ops = vec![
            Operator::Restore,
            Operator::Transform(Matrix::translate(0.0, 50.0)),
            Operator::PaintInlineImage(gray(1, 1)),
        ];
        let tracked = track_images(1, &ops, &resources());
        assert_eq!(tracked.painted[0].placement.visual_top, 51.0);
    }
}
