use crate::affine_transform::AffineTransform;
use crate::bounding_box::BoundingBox;
use crate::mask::Mask;
use crate::point::Point2D;
use crate::{Error, Result};

/// A basic representation of an image with RGBA pixel data.
/// Each pixel occupies 4 bytes: R, G, B, and A (alpha).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Pixel data stored in a 1D `Vec<u8>`, in RGBA format (4 bytes per pixel).
    pub img_data: Vec<u8>,
    /// The width (in pixels) of the image.
    pub width: usize,
    /// The height (in pixels) of the image.
    pub height: usize,
}

impl Default for Photo {
    /// Creates an empty `Photo` with zero width and height, and no image data.
    fn default() -> Photo {
        Photo {
            img_data: Vec::new(),
            width: 0,
            height: 0,
        }
    }
}

/// Maps an out-of-range index back into `0..n` by mirroring about the edge
/// pixels without repeating them (`-1 -> 1`, `n -> n - 2`).
fn reflect_101(i: i64, n: i64) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

impl Photo {
    /// Creates a `width` x `height` photo with every byte set to zero.
    pub fn new(width: usize, height: usize) -> Photo {
        Photo {
            img_data: vec![0u8; width * height * 4],
            width,
            height,
        }
    }

    /// Creates a photo where every pixel has the colour `rgba`.
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Photo {
        Photo {
            img_data: rgba.repeat(width * height),
            width,
            height,
        }
    }

    /// Builds a photo by evaluating `f(x, y)` for every pixel.
    ///
    /// # Examples
    /// ```
    /// # use faceswap::photo::Photo;
    /// let ramp = Photo::from_fn(4, 2, |x, _| [x as u8 * 10, 0, 0, 255]);
    /// assert_eq!(ramp.get_rgba(3, 1), [30, 0, 0, 255]);
    /// ```
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Photo
    where
        F: Fn(usize, usize) -> [u8; 4],
    {
        let mut img_data = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                img_data.extend_from_slice(&f(x, y));
            }
        }
        Photo {
            img_data,
            width,
            height,
        }
    }

    /// Wraps an RGBA8 buffer, checking that its length matches the dimensions.
    pub fn from_raw(width: usize, height: usize, img_data: Vec<u8>) -> Result<Photo> {
        if img_data.len() != width * height * 4 {
            return Err(Error::InvalidImageBuffer {
                len: img_data.len(),
                width,
                height,
            });
        }
        Ok(Photo {
            img_data,
            width,
            height,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the RGBA pixel at `(x, y)`, or transparent black when out of bounds.
    pub fn get_rgba(&self, x: usize, y: usize) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let index = (y * self.width + x) * 4;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.img_data[index..index + 4]);
        px
    }

    /// Writes the RGBA pixel at `(x, y)`; out-of-bounds writes are ignored.
    pub fn set_rgba(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (y * self.width + x) * 4;
        self.img_data[index..index + 4].copy_from_slice(&rgba);
    }

    /// Samples the photo at continuous pixel-index coordinates `(x, y)` with
    /// bilinear interpolation. Samples falling outside the photo are mirrored
    /// back in (reflect-101), so patch edges never pull in black.
    ///
    /// # Returns
    /// The interpolated `[R, G, B, A]` as floats in `0.0..=255.0`, or zeros for
    /// an empty photo.
    pub fn sample_bilinear_reflect(&self, x: f32, y: f32) -> [f32; 4] {
        if self.is_empty() {
            return [0.0; 4];
        }
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (w, h) = (self.width as i64, self.height as i64);
        let xs = [reflect_101(x0 as i64, w), reflect_101(x0 as i64 + 1, w)];
        let ys = [reflect_101(y0 as i64, h), reflect_101(y0 as i64 + 1, h)];

        let p00 = self.get_rgba(xs[0], ys[0]);
        let p10 = self.get_rgba(xs[1], ys[0]);
        let p01 = self.get_rgba(xs[0], ys[1]);
        let p11 = self.get_rgba(xs[1], ys[1]);

        let mut out = [0.0f32; 4];
        for c in 0..4 {
            let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
            let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
            out[c] = top * (1.0 - fy) + bottom * fy;
        }
        out
    }

    /// Produces a new `Photo` stretched to exactly `new_width` x `new_height`.
    ///
    /// The aspect ratio is **not** preserved. Each output pixel centre is mapped
    /// back into this photo and sampled bilinearly, clamping at the edges.
    ///
    /// # Parameters
    /// - `new_width`: The desired width of the resized image.
    /// - `new_height`: The desired height of the resized image.
    ///
    /// # Returns
    /// A new `Photo` of the requested size. An empty photo is returned when
    /// this photo or the requested size is empty.
    pub fn get_scaled(&self, new_width: usize, new_height: usize) -> Photo {
        if self.is_empty() || new_width == 0 || new_height == 0 {
            return Photo::new(new_width, new_height);
        }
        if new_width == self.width && new_height == self.height {
            return self.clone();
        }

        let scale_x = self.width as f32 / new_width as f32;
        let scale_y = self.height as f32 / new_height as f32;
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;

        let mut new_img_data = Vec::with_capacity(new_width * new_height * 4);
        for new_y in 0..new_height {
            // pixel centre in the original, expressed as a pixel index
            let sy = ((new_y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
            for new_x in 0..new_width {
                let sx = ((new_x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
                let px = self.sample_bilinear_reflect(sx, sy);
                new_img_data.extend(px.iter().map(|v| v.round().clamp(0.0, 255.0) as u8));
            }
        }

        Photo {
            img_data: new_img_data,
            width: new_width,
            height: new_height,
        }
    }

    /// Copies the pixels inside `region` into a new photo.
    ///
    /// Parts of `region` lying outside this photo come out as transparent black.
    pub fn crop(&self, region: &BoundingBox) -> Photo {
        if region.is_empty() {
            return Photo::default();
        }
        let (w, h) = (region.width as usize, region.height as usize);
        let mut out = Photo::new(w, h);
        for y in 0..h {
            let sy = region.y + y as i64;
            if sy < 0 || sy >= self.height as i64 {
                continue;
            }
            for x in 0..w {
                let sx = region.x + x as i64;
                if sx < 0 || sx >= self.width as i64 {
                    continue;
                }
                out.set_rgba(x, y, self.get_rgba(sx as usize, sy as usize));
            }
        }
        out
    }

    /// Copies `patch` into this photo at `region`, but only where `mask` is set.
    ///
    /// `patch` and `mask` are `region`-sized; pixels of this photo outside the
    /// mask (or outside `region`) are left untouched.
    pub fn paste_masked(&mut self, patch: &Photo, mask: &Mask, region: &BoundingBox) {
        for y in 0..patch.height.min(mask.height()) {
            let dy = region.y + y as i64;
            if dy < 0 || dy >= self.height as i64 {
                continue;
            }
            for x in 0..patch.width.min(mask.width()) {
                let dx = region.x + x as i64;
                if dx < 0 || dx >= self.width as i64 || !mask.get(x, y) {
                    continue;
                }
                self.set_rgba(dx as usize, dy as usize, patch.get_rgba(x, y));
            }
        }
    }

    /// Renders `overlay` on top of this photo through `transform`, which maps
    /// overlay pixel space into photo pixel space.
    ///
    /// Each photo pixel covered by the transformed overlay is mapped back into
    /// the overlay, sampled bilinearly and composited with source-over alpha.
    /// A singular transform draws nothing.
    pub fn draw_overlay(&mut self, overlay: &Photo, transform: &AffineTransform) {
        if overlay.is_empty() || self.is_empty() {
            return;
        }
        let Some(inverse) = transform.inverse() else {
            return;
        };

        let (ow, oh) = (overlay.width as f32, overlay.height as f32);
        let corners = [(0.0, 0.0), (ow, 0.0), (ow, oh), (0.0, oh)]
            .map(|(x, y)| transform.transform_point(Point2D::new(x, y)));
        let footprint = BoundingBox::of_points(&corners);
        if footprint.is_empty() {
            return;
        }
        let x_start = footprint.x.max(0);
        let y_start = footprint.y.max(0);
        let x_end = footprint.right().min(self.width as i64);
        let y_end = footprint.bottom().min(self.height as i64);

        for y in y_start..y_end {
            for x in x_start..x_end {
                let (u, v) = inverse.transform(x as f32 + 0.5, y as f32 + 0.5);
                if u < 0.0 || v < 0.0 || u >= ow || v >= oh {
                    continue;
                }
                let src = overlay.sample_bilinear_reflect(u - 0.5, v - 0.5);
                let alpha = src[3] / 255.0;
                if alpha <= 0.0 {
                    continue;
                }
                let dst = self.get_rgba(x as usize, y as usize);
                let dst_alpha = dst[3] as f32 / 255.0;
                let out_alpha = alpha + dst_alpha * (1.0 - alpha);
                let mut out = [0u8; 4];
                for c in 0..3 {
                    let blended = (src[c] * alpha + dst[c] as f32 * dst_alpha * (1.0 - alpha))
                        / out_alpha.max(f32::EPSILON);
                    out[c] = blended.round().clamp(0.0, 255.0) as u8;
                }
                out[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
                self.set_rgba(x as usize, y as usize, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_101_mirrors_without_repeating_the_edge() {
        assert_eq!(reflect_101(-1, 4), 1);
        assert_eq!(reflect_101(-2, 4), 2);
        assert_eq!(reflect_101(4, 4), 2);
        assert_eq!(reflect_101(5, 4), 1);
        assert_eq!(reflect_101(2, 4), 2);
        assert_eq!(reflect_101(7, 1), 0);
    }

    #[test]
    fn from_raw_rejects_short_buffers() {
        assert!(Photo::from_raw(2, 2, vec![0; 15]).is_err());
        assert!(Photo::from_raw(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn bilinear_sample_interpolates_between_pixels() {
        let photo = Photo::from_fn(2, 1, |x, _| [x as u8 * 100, 0, 0, 255]);
        let px = photo.sample_bilinear_reflect(0.5, 0.0);
        assert!((px[0] - 50.0).abs() < 1e-4);
        assert_eq!(px[3], 255.0);
    }

    #[test]
    fn stretch_keeps_solid_colour_and_changes_aspect() {
        let photo = Photo::filled(3, 5, [10, 20, 30, 255]);
        let scaled = photo.get_scaled(8, 2);
        assert_eq!((scaled.width, scaled.height), (8, 2));
        assert_eq!(scaled, Photo::filled(8, 2, [10, 20, 30, 255]));
    }

    #[test]
    fn paste_respects_the_mask() {
        let mut canvas = Photo::new(4, 4);
        let patch = Photo::filled(2, 2, [255, 255, 255, 255]);
        let mut mask = Mask::new(2, 2);
        mask.set(1, 0, true);
        canvas.paste_masked(&patch, &mask, &BoundingBox::new(1, 1, 2, 2));
        assert_eq!(canvas.get_rgba(2, 1), [255; 4]);
        assert_eq!(canvas.get_rgba(1, 1), [0; 4]);
        assert_eq!(canvas.get_rgba(2, 2), [0; 4]);
    }

    #[test]
    fn crop_outside_is_transparent() {
        let photo = Photo::filled(2, 2, [9, 9, 9, 255]);
        let cropped = photo.crop(&BoundingBox::new(1, 1, 2, 2));
        assert_eq!(cropped.get_rgba(0, 0), [9, 9, 9, 255]);
        assert_eq!(cropped.get_rgba(1, 1), [0; 4]);
    }

    #[test]
    fn opaque_overlay_replaces_covered_pixels() {
        let mut photo = Photo::filled(10, 10, [0, 0, 255, 255]);
        let sticker = Photo::filled(2, 2, [255, 0, 0, 255]);
        let t = AffineTransform::scaling(2.0).post_translate(3.0, 3.0);
        photo.draw_overlay(&sticker, &t);
        assert_eq!(photo.get_rgba(3, 3), [255, 0, 0, 255]);
        assert_eq!(photo.get_rgba(6, 6), [255, 0, 0, 255]);
        assert_eq!(photo.get_rgba(7, 7), [0, 0, 255, 255]);
        assert_eq!(photo.get_rgba(2, 3), [0, 0, 255, 255]);
    }

    #[test]
    fn transparent_overlay_leaves_photo_alone() {
        let mut photo = Photo::filled(4, 4, [1, 2, 3, 255]);
        let before = photo.clone();
        photo.draw_overlay(&Photo::new(2, 2), &AffineTransform::identity());
        assert_eq!(photo, before);
    }

    #[test]
    fn enormous_overlay_covers_the_whole_photo() {
        let mut photo = Photo::filled(6, 6, [0, 0, 255, 255]);
        let sticker = Photo::filled(2, 2, [0, 255, 0, 255]);
        let t = AffineTransform::translation(-1.0, -1.0)
            .post_scale(1e12)
            .post_translate(3.0, 3.0);
        photo.draw_overlay(&sticker, &t);
        assert_eq!(photo, Photo::filled(6, 6, [0, 255, 0, 255]));
    }
}
