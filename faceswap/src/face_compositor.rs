use rayon::prelude::*;

use crate::affine_warp::{warp_triangle, WarpSkip, WarpedTriangle};
use crate::config::SwapConfig;
use crate::convex_hull::{centroid, convex_hull};
use crate::mask::Mask;
use crate::photo::Photo;
use crate::point::{LandmarkSet, LANDMARK_COUNT};
use crate::seamless_clone::seamless_clone;
use crate::triangle_mesh::{Triangle, TriangleMeshBuilder, TriangleSet};
use crate::{Error, Result};

/// Result of a face swap, with the counts needed to tell a real swap from
/// the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapOutcome {
    /// The blended image, or an unmodified copy of the destination.
    pub image: Photo,
    pub triangles_attempted: usize,
    pub triangles_warped: usize,
    /// `false` when the swap fell back to returning the destination.
    pub blended: bool,
    /// Pipeline stages, kept when `SwapConfig::keep_intermediates` is set.
    pub intermediates: Option<SwapIntermediates>,
}

/// Images produced on the way to the blended result.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapIntermediates {
    /// The source stretched to the destination size.
    pub scaled_source: Photo,
    /// Convex hull of the destination landmarks.
    pub hull_mask: Mask,
    /// Warped triangles on a transparent canvas, before blending.
    pub canvas: Photo,
}

/// Moves the face of one image onto the face of another.
///
/// # How It Works
/// 1. The source image is stretched to the destination size, and the source
///    landmarks are scaled by the same factors.
/// 2. Every triangle is warped from source to destination independently
///    (optionally on the rayon pool) and written into an all-zero canvas,
///    only within its own triangle mask. Writes happen in triangle order.
/// 3. The convex hull of the destination landmarks is rasterized and the
///    canvas is blended into the destination inside it, anchored at the hull
///    centroid.
///
/// When the hull covers no pixel, no triangle could be warped or no hull
/// pixel lands inside the destination border, the destination is returned
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct FaceCompositor {
    config: SwapConfig,
}

impl FaceCompositor {
    pub fn new(config: SwapConfig) -> Self {
        FaceCompositor { config }
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    /// Triangulates `landmarks` over `image` with the configured tolerance.
    pub fn triangulate(&self, image: &Photo, landmarks: &LandmarkSet) -> TriangleSet {
        TriangleMeshBuilder::new(self.config.match_tolerance_sq).build(image.width, image.height, landmarks.points())
    }

    /// Swaps the face under `source_landmarks` in `source` onto the face under
    /// `dest_landmarks` in `dest`.
    ///
    /// # Parameters
    /// - `source_landmarks`: in `source` pixel coordinates.
    /// - `dest_landmarks`: in `dest` pixel coordinates.
    /// - `triangles`: index triples valid for both landmark sets, typically
    ///   from [`FaceCompositor::triangulate`] on the destination.
    ///
    /// # Errors
    /// Either landmark set holding fewer than 468 points, a triangle index out
    /// of range, or an empty image. Geometric failures are never errors.
    #[tracing::instrument(skip_all, fields(width = dest.width, height = dest.height, triangles = triangles.len()))]
    pub fn swap_face(
        &self,
        source: &Photo,
        dest: &Photo,
        source_landmarks: &LandmarkSet,
        dest_landmarks: &LandmarkSet,
        triangles: &[Triangle],
    ) -> Result<SwapOutcome> {
        check_landmarks("source", source_landmarks)?;
        check_landmarks("destination", dest_landmarks)?;
        check_image("source", source)?;
        check_image("destination", dest)?;
        let len = source_landmarks.len().min(dest_landmarks.len());
        if let Some(t) = triangles.iter().find(|t| t.indices().iter().any(|&i| i >= len)) {
            return Err(Error::TriangleIndexOutOfRange {
                a: t.0,
                b: t.1,
                c: t.2,
                len,
            });
        }

        let (width, height) = (dest.width, dest.height);
        let source_landmarks = source_landmarks.scaled(
            width as f32 / source.width as f32,
            height as f32 / source.height as f32,
        );
        let source = source.get_scaled(width, height);

        let hull = convex_hull(dest_landmarks.points());
        let hull_mask = Mask::from_polygon(width, height, &hull);

        let warp = |t: &Triangle| -> std::result::Result<WarpedTriangle, WarpSkip> {
            warp_triangle(
                &source,
                &source_landmarks.triangle(t),
                &dest_landmarks.triangle(t),
                width,
                height,
            )
        };
        let warped: Vec<_> = if self.config.parallel_warp {
            triangles.par_iter().map(warp).collect()
        } else {
            triangles.iter().map(warp).collect()
        };

        let mut canvas = Photo::new(width, height);
        let mut triangles_warped = 0;
        for (triangle, result) in triangles.iter().zip(warped) {
            match result {
                Ok(patch) => {
                    patch.composite_onto(&mut canvas);
                    triangles_warped += 1;
                }
                Err(skip) => tracing::trace!(?triangle, %skip, "triangle skipped"),
            }
        }
        tracing::info!(
            total = triangles.len(),
            copied = triangles_warped,
            "triangles warped"
        );

        let blended = if triangles_warped == 0 {
            None
        } else {
            let center = centroid(&hull, dest_landmarks.points());
            seamless_clone(&canvas, dest, &hull_mask, center, &self.config.blend)
        };
        if blended.is_none() {
            tracing::warn!(
                hull_pixels = hull_mask.count_nonzero(),
                triangles_warped,
                "nothing to blend, returning the destination unchanged"
            );
        }

        let intermediates = self.config.keep_intermediates.then(|| SwapIntermediates {
            scaled_source: source.clone(),
            hull_mask,
            canvas,
        });
        Ok(SwapOutcome {
            blended: blended.is_some(),
            image: blended.unwrap_or_else(|| dest.clone()),
            triangles_attempted: triangles.len(),
            triangles_warped,
            intermediates,
        })
    }
}

/// Swaps faces with the default configuration, returning only the image.
pub fn swap_face(
    source: &Photo,
    dest: &Photo,
    source_landmarks: &LandmarkSet,
    dest_landmarks: &LandmarkSet,
    triangles: &[Triangle],
) -> Result<Photo> {
    Ok(FaceCompositor::default()
        .swap_face(source, dest, source_landmarks, dest_landmarks, triangles)?
        .image)
}

fn check_landmarks(role: &'static str, landmarks: &LandmarkSet) -> Result<()> {
    if landmarks.is_complete() {
        Ok(())
    } else {
        Err(Error::InsufficientLandmarks {
            role,
            expected: LANDMARK_COUNT,
            actual: landmarks.len(),
        })
    }
}

fn check_image(role: &'static str, image: &Photo) -> Result<()> {
    if image.is_empty() || image.img_data.len() != image.width * image.height * 4 {
        return Err(Error::EmptyImage {
            role,
            width: image.width,
            height: image.height,
        });
    }
    Ok(())
}
