use rayon::prelude::*;

use crate::config::BlendConfig;
use crate::mask::Mask;
use crate::photo::Photo;
use crate::point::Point2D;

const NO_UNKNOWN: usize = usize::MAX;
const NEIGHBOURS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// The Poisson system for one clone: which destination pixels are solved
/// for, and how they are connected.
struct Domain {
    /// Destination coordinates of each unknown.
    dst_pos: Vec<(usize, usize)>,
    /// Matching source coordinates of each unknown.
    src_pos: Vec<(usize, usize)>,
    /// Unknown index of each of the four neighbours, or `NO_UNKNOWN` when the
    /// neighbour is a fixed destination pixel.
    links: Vec<[usize; 4]>,
}

/// Inserts the masked part of `src` into `dst` with gradient-domain (Poisson)
/// blending, keeping `dst` continuous along the mask boundary.
///
/// `mask` is `src`-sized. The bounding box of its set pixels is placed so that
/// the box centre lands on `center` in `dst`; masked pixels that end up on the
/// border of `dst` or outside it are left as they are. The alpha channel is
/// taken from `dst`.
///
/// # How It Works
/// Within the mask the result `f` satisfies `Δf = Δsrc`, with `f = dst` on
/// the pixels surrounding the mask. Source gradients are used only between
/// pairs of masked pixels, so whatever `src` holds outside the mask never
/// leaks in. Each RGB channel is solved by successive over-relaxation, the
/// three channels in parallel.
///
/// # Returns
/// The blended image, or `None` when no masked pixel lands strictly inside
/// `dst`, in which case there is nothing to solve for.
pub fn seamless_clone(src: &Photo, dst: &Photo, mask: &Mask, center: Point2D, config: &BlendConfig) -> Option<Photo> {
    let roi = mask.bounding_box()?;
    // integer placement of the roi centred on `center`
    let dx = center.x as i64 - roi.width / 2 - roi.x;
    let dy = center.y as i64 - roi.height / 2 - roi.y;

    let domain = build_domain(src, dst, mask, dx, dy);
    if domain.dst_pos.is_empty() {
        return None;
    }
    tracing::debug!(unknowns = domain.dst_pos.len(), dx, dy, "solving Poisson blend");

    let channels: Vec<Vec<f64>> = (0..3usize)
        .into_par_iter()
        .map(|channel| solve_channel(src, dst, mask, &domain, channel, config))
        .collect();

    let mut out = dst.clone();
    for (i, &(x, y)) in domain.dst_pos.iter().enumerate() {
        let mut px = dst.get_rgba(x, y);
        for (c, values) in channels.iter().enumerate() {
            px[c] = values[i].round().clamp(0.0, 255.0) as u8;
        }
        out.set_rgba(x, y, px);
    }
    Some(out)
}

fn build_domain(src: &Photo, dst: &Photo, mask: &Mask, dx: i64, dy: i64) -> Domain {
    let (w, h) = (dst.width as i64, dst.height as i64);
    let mut index = vec![NO_UNKNOWN; dst.width * dst.height];
    let mut dst_pos = Vec::new();
    let mut src_pos = Vec::new();

    for sy in 0..mask.height().min(src.height) {
        for sx in 0..mask.width().min(src.width) {
            if !mask.get(sx, sy) {
                continue;
            }
            let (x, y) = (sx as i64 + dx, sy as i64 + dy);
            // the image border always stays fixed
            if x < 1 || y < 1 || x >= w - 1 || y >= h - 1 {
                continue;
            }
            index[(y * w + x) as usize] = dst_pos.len();
            dst_pos.push((x as usize, y as usize));
            src_pos.push((sx, sy));
        }
    }

    let links = dst_pos
        .iter()
        .map(|&(x, y)| {
            NEIGHBOURS.map(|(ox, oy)| {
                let (nx, ny) = (x as i64 + ox, y as i64 + oy);
                index[(ny * w + nx) as usize]
            })
        })
        .collect();

    Domain {
        dst_pos,
        src_pos,
        links,
    }
}

fn solve_channel(
    src: &Photo,
    dst: &Photo,
    mask: &Mask,
    domain: &Domain,
    channel: usize,
    config: &BlendConfig,
) -> Vec<f64> {
    let src_value = |x: usize, y: usize| src.get_rgba(x, y)[channel] as f64;
    let dst_value = |x: usize, y: usize| dst.get_rgba(x, y)[channel] as f64;

    // Constant right-hand side: guidance plus fixed neighbours. The boundary
    // offset collects the colour step from source to destination at the edge.
    let n = domain.dst_pos.len();
    let mut rhs = vec![0.0f64; n];
    let (mut offset_sum, mut offset_count) = (0.0f64, 0usize);
    for i in 0..n {
        let (sx, sy) = domain.src_pos[i];
        let (x, y) = domain.dst_pos[i];
        let here = src_value(sx, sy);
        for (k, (ox, oy)) in NEIGHBOURS.iter().enumerate() {
            let (nsx, nsy) = (sx as i64 + ox, sy as i64 + oy);
            if nsx >= 0 && nsy >= 0 && mask.get(nsx as usize, nsy as usize) {
                rhs[i] += here - src_value(nsx as usize, nsy as usize);
            }
            if domain.links[i][k] == NO_UNKNOWN {
                let (nx, ny) = ((x as i64 + ox) as usize, (y as i64 + oy) as usize);
                let fixed = dst_value(nx, ny);
                rhs[i] += fixed;
                offset_sum += fixed - here;
                offset_count += 1;
            }
        }
    }
    let offset = if offset_count > 0 {
        offset_sum / offset_count as f64
    } else {
        0.0
    };

    let mut f: Vec<f64> = domain
        .src_pos
        .iter()
        .map(|&(sx, sy)| src_value(sx, sy) + offset)
        .collect();

    let omega = config.relaxation;
    let mut iterations = 0;
    let mut max_change = f64::INFINITY;
    while iterations < config.max_iterations && max_change >= config.tolerance {
        max_change = 0.0;
        for i in 0..n {
            let mut sum = rhs[i];
            for &j in &domain.links[i] {
                if j != NO_UNKNOWN {
                    sum += f[j];
                }
            }
            let updated = (1.0 - omega) * f[i] + omega * sum / 4.0;
            max_change = max_change.max((updated - f[i]).abs());
            f[i] = updated;
        }
        iterations += 1;
    }
    tracing::trace!(channel, iterations, residual = max_change, "Poisson channel solved");
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounding_box::BoundingBox;

    fn square_mask(size: usize, from: f32, to: f32) -> Mask {
        Mask::from_polygon(
            size,
            size,
            &[
                Point2D::new(from, from),
                Point2D::new(to, from),
                Point2D::new(to, to),
                Point2D::new(from, to),
            ],
        )
    }

    #[test]
    fn identical_flat_images_are_unchanged() {
        let img = Photo::filled(12, 12, [90, 120, 30, 255]);
        let mask = square_mask(12, 3.0, 9.0);
        let out = seamless_clone(&img, &img, &mask, Point2D::new(6.0, 6.0), &BlendConfig::default()).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn flat_source_takes_the_destination_colour() {
        // no gradients inside the source, so the solution is the boundary colour
        let src = Photo::filled(16, 16, [255, 0, 0, 255]);
        let dst = Photo::filled(16, 16, [10, 200, 10, 255]);
        let mask = square_mask(16, 4.0, 12.0);
        let out = seamless_clone(&src, &dst, &mask, Point2D::new(8.0, 8.0), &BlendConfig::default()).unwrap();
        for y in 0..16 {
            for x in 0..16 {
                let px = out.get_rgba(x, y);
                for c in 0..3 {
                    assert!((px[c] as i32 - [10, 200, 10][c]).abs() <= 1, "({x}, {y}) = {px:?}");
                }
            }
        }
    }

    #[test]
    fn source_gradients_survive_the_blend() {
        let src = Photo::from_fn(20, 20, |x, _| [(x * 12) as u8, 0, 0, 255]);
        let dst = Photo::filled(20, 20, [100, 100, 100, 255]);
        let mask = square_mask(20, 5.0, 15.0);
        let out = seamless_clone(&src, &dst, &mask, Point2D::new(10.0, 10.0), &BlendConfig::default()).unwrap();
        // left of the patch stays darker than the right
        let column = |x: usize| (6..14).map(|y| out.get_rgba(x, y)[0] as u32).sum::<u32>();
        assert!(column(6) < column(13));
        // outside the mask nothing changes
        assert_eq!(out.get_rgba(2, 2), [100, 100, 100, 255]);
        assert_eq!(out.get_rgba(17, 10), [100, 100, 100, 255]);
    }

    #[test]
    fn patch_is_moved_to_the_requested_centre() {
        let src = Photo::filled(20, 20, [0, 0, 0, 255]);
        let dst = Photo::filled(20, 20, [50, 50, 50, 255]);
        let mask = square_mask(20, 2.0, 6.0);
        assert_eq!(mask.bounding_box(), Some(BoundingBox::new(2, 2, 4, 4)));
        let out = seamless_clone(&src, &dst, &mask, Point2D::new(14.0, 14.0), &BlendConfig::default()).unwrap();
        // the original mask location is untouched, and the flat patch blends to the boundary colour
        assert_eq!(out, dst);
    }

    #[test]
    fn empty_mask_has_nothing_to_solve() {
        let src = Photo::filled(8, 8, [1, 1, 1, 255]);
        let dst = Photo::filled(8, 8, [2, 2, 2, 255]);
        let out = seamless_clone(&src, &dst, &Mask::new(8, 8), Point2D::new(4.0, 4.0), &BlendConfig::default());
        assert_eq!(out, None);
    }

    #[test]
    fn mask_on_the_image_border_has_nothing_to_solve() {
        let src = Photo::filled(8, 8, [1, 1, 1, 255]);
        let dst = Photo::filled(8, 8, [2, 2, 2, 255]);
        let mut mask = Mask::new(8, 8);
        for x in 2..6 {
            mask.set(x, 0, true);
        }
        let out = seamless_clone(&src, &dst, &mask, Point2D::new(4.0, 0.0), &BlendConfig::default());
        assert_eq!(out, None);
        // the same strip placed inside the image is solved
        assert!(seamless_clone(&src, &dst, &mask, Point2D::new(4.0, 4.0), &BlendConfig::default()).is_some());
    }

    #[test]
    fn border_pixels_are_never_solved() {
        let src = Photo::filled(6, 6, [255, 255, 255, 255]);
        let dst = Photo::from_fn(6, 6, |x, y| [(x * 40) as u8, (y * 40) as u8, 0, 255]);
        let mask = square_mask(6, 0.0, 6.0);
        let out = seamless_clone(&src, &dst, &mask, Point2D::new(3.0, 3.0), &BlendConfig::default()).unwrap();
        for i in 0..6 {
            assert_eq!(out.get_rgba(i, 0), dst.get_rgba(i, 0));
            assert_eq!(out.get_rgba(0, i), dst.get_rgba(0, i));
            assert_eq!(out.get_rgba(i, 5), dst.get_rgba(i, 5));
            assert_eq!(out.get_rgba(5, i), dst.get_rgba(5, i));
        }
    }
}
