use nalgebra::Matrix3;

use crate::point::Point2D;

/// Represents a 2D affine transformation as a 2×3 matrix:
/// - A 2×2 linear part (`a11`, `a12`, `a21`, `a22`).
/// - A translation offset (`translate_x`, `translate_y`).
///
/// A point `(x, y)` is transformed into `(X, Y)` by:
///
/// ```text
///   X = (x * a11) + (y * a12) + translate_x;
///   Y = (x * a21) + (y * a22) + translate_y;
/// ```
///
/// The same type carries the per-triangle warps of the face compositor and the
/// similarity transforms (translate + uniform scale + rotate) used to place
/// overlays. Values are produced fresh for every triangle and every placement.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AffineTransform {
    /// Matrix entry: row 1, col 1.
    pub a11: f32,

    /// Matrix entry: row 1, col 2.
    pub a12: f32,

    /// Matrix entry: row 2, col 1.
    pub a21: f32,

    /// Matrix entry: row 2, col 2.
    pub a22: f32,

    /// Translation offset in the transformed space (x-direction).
    pub translate_x: f32,

    /// Translation offset in the transformed space (y-direction).
    pub translate_y: f32,
}

impl Default for AffineTransform {
    fn default() -> Self {
        AffineTransform::identity()
    }
}

impl AffineTransform {
    pub const fn identity() -> AffineTransform {
        AffineTransform {
            a11: 1.0,
            a12: 0.0,
            a21: 0.0,
            a22: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }

    pub fn translation(tx: f32, ty: f32) -> AffineTransform {
        AffineTransform {
            translate_x: tx,
            translate_y: ty,
            ..AffineTransform::identity()
        }
    }

    /// Uniform scale about the origin.
    pub fn scaling(scale: f32) -> AffineTransform {
        AffineTransform {
            a11: scale,
            a22: scale,
            ..AffineTransform::identity()
        }
    }

    /// Rotation about the origin by `degrees`. With `y` pointing down, positive
    /// angles turn clockwise on screen.
    pub fn rotation(degrees: f32) -> AffineTransform {
        let (s, c) = (degrees as f64).to_radians().sin_cos();
        AffineTransform {
            a11: c as f32,
            a12: -s as f32,
            a21: s as f32,
            a22: c as f32,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }

    /// Solves the unique affine map sending each `src[i]` to `dst[i]`.
    ///
    /// Three correspondences fix all six unknowns, so the solve is a direct
    /// 3×3 inversion:
    ///
    /// ```text
    ///   [X0 X1 X2]         [x0 x1 x2] -1
    ///   [Y0 Y1 Y2]  *      [y0 y1 y2]
    ///                      [ 1  1  1]
    /// ```
    ///
    /// # Returns
    /// `None` when the source points are collinear (or nearly so).
    ///
    /// # Examples
    /// ```
    /// # use faceswap::affine_transform::AffineTransform;
    /// # use faceswap::point::Point2D;
    /// let src = [Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0), Point2D::new(0.0, 1.0)];
    /// let dst = [Point2D::new(10.0, 10.0), Point2D::new(12.0, 10.0), Point2D::new(10.0, 13.0)];
    /// let t = AffineTransform::from_triangles(&src, &dst).unwrap();
    /// let (x, y) = t.transform(1.0, 1.0);
    /// assert!((x - 12.0).abs() < 1e-5 && (y - 13.0).abs() < 1e-5);
    /// ```
    pub fn from_triangles(src: &[Point2D; 3], dst: &[Point2D; 3]) -> Option<AffineTransform> {
        let s = Matrix3::new(
            src[0].x as f64, src[1].x as f64, src[2].x as f64,
            src[0].y as f64, src[1].y as f64, src[2].y as f64,
            1.0, 1.0, 1.0,
        );
        // Twice the signed area; reject slivers relative to the triangle's extent.
        let scale = s.iter().fold(1.0f64, |m, v| m.max(v.abs()));
        if s.determinant().abs() <= 1e-9 * scale * scale {
            return None;
        }
        let s_inv = s.try_inverse()?;
        let d = Matrix3::new(
            dst[0].x as f64, dst[1].x as f64, dst[2].x as f64,
            dst[0].y as f64, dst[1].y as f64, dst[2].y as f64,
            1.0, 1.0, 1.0,
        );
        Some(AffineTransform::from_matrix3(&(d * s_inv)))
    }

    /// Homogeneous 3×3 form, with `[0 0 1]` as the last row.
    pub fn to_matrix3(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.a11 as f64, self.a12 as f64, self.translate_x as f64,
            self.a21 as f64, self.a22 as f64, self.translate_y as f64,
            0.0, 0.0, 1.0,
        )
    }

    /// Reads the top two rows of a homogeneous 3×3 matrix.
    pub fn from_matrix3(m: &Matrix3<f64>) -> AffineTransform {
        AffineTransform {
            a11: m[(0, 0)] as f32,
            a12: m[(0, 1)] as f32,
            a21: m[(1, 0)] as f32,
            a22: m[(1, 1)] as f32,
            translate_x: m[(0, 2)] as f32,
            translate_y: m[(1, 2)] as f32,
        }
    }

    /// Returns the transform that applies `self` first and then `next`.
    pub fn then(&self, next: &AffineTransform) -> AffineTransform {
        AffineTransform::from_matrix3(&(next.to_matrix3() * self.to_matrix3()))
    }

    pub fn post_translate(self, tx: f32, ty: f32) -> AffineTransform {
        self.then(&AffineTransform::translation(tx, ty))
    }

    pub fn post_scale(self, scale: f32) -> AffineTransform {
        self.then(&AffineTransform::scaling(scale))
    }

    pub fn post_rotate(self, degrees: f32) -> AffineTransform {
        self.then(&AffineTransform::rotation(degrees))
    }

    /// Inverse transform, or `None` if the linear part is singular.
    pub fn inverse(&self) -> Option<AffineTransform> {
        let det = self.a11 as f64 * self.a22 as f64 - self.a12 as f64 * self.a21 as f64;
        if det.abs() < 1e-12 {
            return None;
        }
        self.to_matrix3().try_inverse().map(|m| AffineTransform::from_matrix3(&m))
    }

    /// Transform a point (x, y) according to this affine transform.
    ///
    /// # Examples
    /// ```
    /// # use faceswap::affine_transform::AffineTransform;
    /// let t = AffineTransform::translation(10.0, 20.0);
    /// assert_eq!(t.transform(1.0, 2.0), (11.0, 22.0));
    /// ```
    pub fn transform(&self, x: f32, y: f32) -> (f32, f32) {
        let tx = self.a11 * x + self.a12 * y + self.translate_x;
        let ty = self.a21 * x + self.a22 * y + self.translate_y;
        (tx, ty)
    }

    pub fn transform_point(&self, p: Point2D) -> Point2D {
        let (x, y) = self.transform(p.x, p.y);
        Point2D::new(x, y)
    }

    /// Uniform scale of a similarity transform (square root of the absolute determinant).
    pub fn scale_factor(&self) -> f32 {
        (self.a11 * self.a22 - self.a12 * self.a21).abs().sqrt()
    }

    /// Rotation angle of a similarity transform, in degrees.
    pub fn rotation_degrees(&self) -> f32 {
        self.a21.atan2(self.a11).to_degrees()
    }

    pub fn is_identity(&self) -> bool {
        *self == AffineTransform::identity()
    }
}
