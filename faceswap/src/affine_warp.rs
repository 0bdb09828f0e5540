use thiserror::Error;

use crate::affine_transform::AffineTransform;
use crate::bounding_box::BoundingBox;
use crate::mask::Mask;
use crate::photo::Photo;
use crate::point::Point2D;

/// Why a triangle was left out of the composite.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum WarpSkip {
    #[error("bounding box has no area")]
    EmptyBoundingBox,
    #[error("source bounding box {0:?} leaves the source image")]
    SourceOutOfBounds(BoundingBox),
    #[error("destination bounding box {0:?} leaves the destination image")]
    DestinationOutOfBounds(BoundingBox),
    #[error("triangle vertices are collinear")]
    DegenerateTriangle,
}

/// One source triangle resampled into the frame of its destination triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpedTriangle {
    /// Resampled pixels, the size of `bounding_box`.
    pub patch: Photo,
    /// Pixels of `patch` inside the destination triangle.
    pub mask: Mask,
    /// Where `patch` sits in the destination image.
    pub bounding_box: BoundingBox,
}

impl WarpedTriangle {
    /// Writes the masked patch pixels into `canvas`. Nothing outside
    /// `bounding_box` is touched.
    pub fn composite_onto(&self, canvas: &mut Photo) {
        canvas.paste_masked(&self.patch, &self.mask, &self.bounding_box);
    }
}

/// Warps the part of `src` under `src_tri` onto `dst_tri` in a
/// `dst_width` x `dst_height` destination.
///
/// # How It Works
/// 1. Bounding boxes of both triangles are computed; either box having no
///    area or leaving its image means the triangle is skipped.
/// 2. Both triangles move into their box-local frames and the affine map
///    between them is solved from the three vertex pairs.
/// 3. Every destination box pixel centre is mapped back through the inverse
///    map and sampled bilinearly from the cropped source box, mirroring
///    (reflect-101) at the crop edges so no black bleeds in.
/// 4. The destination triangle is rasterized into a box-sized mask.
///
/// # Returns
/// The patch, its mask and the destination box, or the reason for skipping.
pub fn warp_triangle(
    src: &Photo,
    src_tri: &[Point2D; 3],
    dst_tri: &[Point2D; 3],
    dst_width: usize,
    dst_height: usize,
) -> Result<WarpedTriangle, WarpSkip> {
    let src_box = BoundingBox::of_points(src_tri);
    let dst_box = BoundingBox::of_points(dst_tri);
    if src_box.is_empty() || dst_box.is_empty() {
        return Err(WarpSkip::EmptyBoundingBox);
    }
    if !src_box.fits_within(src.width, src.height) {
        return Err(WarpSkip::SourceOutOfBounds(src_box));
    }
    if !dst_box.fits_within(dst_width, dst_height) {
        return Err(WarpSkip::DestinationOutOfBounds(dst_box));
    }

    let src_local = src_box.to_local(src_tri);
    let dst_local = dst_box.to_local(dst_tri);
    let inverse = AffineTransform::from_triangles(&src_local, &dst_local)
        .and_then(|forward| forward.inverse())
        .ok_or(WarpSkip::DegenerateTriangle)?;

    let src_patch = src.crop(&src_box);
    let (width, height) = (dst_box.width as usize, dst_box.height as usize);
    let mut img_data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = inverse.transform(x as f32 + 0.5, y as f32 + 0.5);
            let px = src_patch.sample_bilinear_reflect(sx - 0.5, sy - 0.5);
            img_data.extend(px.iter().map(|v| v.round().clamp(0.0, 255.0) as u8));
        }
    }
    let patch = Photo {
        img_data,
        width,
        height,
    };

    Ok(WarpedTriangle {
        patch,
        mask: Mask::from_polygon(width, height, &dst_local),
        bounding_box: dst_box,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Photo {
        Photo::from_fn(width, height, |x, y| [(x * 10) as u8, (y * 10) as u8, 7, 255])
    }

    fn tri(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> [Point2D; 3] {
        [Point2D::new(a.0, a.1), Point2D::new(b.0, b.1), Point2D::new(c.0, c.1)]
    }

    #[test]
    fn zero_width_box_is_skipped() {
        let src = gradient(10, 10);
        let flat = tri((3.0, 1.0), (3.0, 5.0), (3.0, 8.0));
        let good = tri((1.0, 1.0), (6.0, 1.0), (1.0, 6.0));
        assert_eq!(warp_triangle(&src, &good, &flat, 10, 10), Err(WarpSkip::EmptyBoundingBox));
        assert_eq!(warp_triangle(&src, &flat, &good, 10, 10), Err(WarpSkip::EmptyBoundingBox));
    }

    #[test]
    fn out_of_bounds_boxes_are_skipped() {
        let src = gradient(10, 10);
        let inside = tri((1.0, 1.0), (6.0, 1.0), (1.0, 6.0));
        let outside = tri((5.0, 5.0), (12.0, 5.0), (5.0, 9.0));
        assert!(matches!(
            warp_triangle(&src, &outside, &inside, 10, 10),
            Err(WarpSkip::SourceOutOfBounds(_))
        ));
        assert!(matches!(
            warp_triangle(&src, &inside, &outside, 10, 10),
            Err(WarpSkip::DestinationOutOfBounds(_))
        ));
    }

    #[test]
    fn landmarks_far_off_the_image_are_skipped() {
        let src = gradient(16, 16);
        let good = tri((1.0, 1.0), (6.0, 1.0), (1.0, 6.0));
        let huge = tri((-1e19, 1.0), (1e19, 1.0), (1.0, 6.0));
        assert!(matches!(
            warp_triangle(&src, &good, &huge, 16, 16),
            Err(WarpSkip::DestinationOutOfBounds(_))
        ));
        assert!(matches!(
            warp_triangle(&src, &huge, &good, 16, 16),
            Err(WarpSkip::SourceOutOfBounds(_))
        ));
    }

    #[test]
    fn collinear_destination_is_degenerate() {
        let src = gradient(10, 10);
        let good = tri((1.0, 1.0), (6.0, 1.0), (1.0, 6.0));
        let line = tri((1.0, 1.0), (5.0, 5.0), (8.0, 8.0));
        assert_eq!(warp_triangle(&src, &good, &line, 10, 10), Err(WarpSkip::DegenerateTriangle));
    }

    #[test]
    fn translated_triangle_copies_source_pixels() {
        let src = gradient(20, 20);
        let src_tri = tri((2.0, 2.0), (10.0, 2.0), (2.0, 10.0));
        let dst_tri = tri((7.0, 5.0), (15.0, 5.0), (7.0, 13.0));
        let warped = warp_triangle(&src, &src_tri, &dst_tri, 20, 20).unwrap();
        assert_eq!(warped.bounding_box, BoundingBox::new(7, 5, 8, 8));
        assert_eq!((warped.patch.width, warped.patch.height), (8, 8));
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(warped.patch.get_rgba(x, y), src.get_rgba(x + 2, y + 2));
            }
        }
        assert!(warped.mask.get(0, 0));
        assert!(!warped.mask.get(7, 7));
    }

    #[test]
    fn compositing_stays_inside_the_destination_box() {
        let src = Photo::filled(16, 16, [200, 100, 50, 255]);
        let src_tri = tri((0.0, 0.0), (16.0, 0.0), (0.0, 16.0));
        let dst_tri = tri((4.0, 4.0), (9.0, 4.0), (4.0, 9.0));
        let warped = warp_triangle(&src, &src_tri, &dst_tri, 16, 16).unwrap();
        let mut canvas = Photo::new(16, 16);
        warped.composite_onto(&mut canvas);
        for y in 0..16 {
            for x in 0..16 {
                let inside_box = (4..9).contains(&x) && (4..9).contains(&y);
                if !inside_box {
                    assert_eq!(canvas.get_rgba(x, y), [0; 4], "wrote outside box at ({x}, {y})");
                }
            }
        }
        assert_eq!(canvas.get_rgba(4, 4), [200, 100, 50, 255]);
    }
}
