use crate::point::Point2D;

/// Box corners are clamped to `±COORD_LIMIT` so that extents never overflow.
const COORD_LIMIT: f64 = i32::MAX as f64;

/// An axis-aligned pixel rectangle `[x, x + width) x [y, y + height)`.
///
/// Coordinates are signed so that boxes computed from landmarks lying off the
/// image can be represented and then rejected.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl BoundingBox {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        BoundingBox { x, y, width, height }
    }

    /// Smallest pixel rectangle containing every point.
    ///
    /// Every pixel whose centre lies inside the hull of `points` is covered.
    /// Points spanning no horizontal (or vertical) distance on integer
    /// coordinates give a zero width (or height). Corners beyond the `i32`
    /// range are clamped to it.
    ///
    /// # Examples
    /// ```
    /// # use faceswap::bounding_box::BoundingBox;
    /// # use faceswap::point::Point2D;
    /// let pts = [Point2D::new(1.5, 2.0), Point2D::new(4.2, 3.0), Point2D::new(2.0, 6.0)];
    /// assert_eq!(BoundingBox::of_points(&pts), BoundingBox::new(1, 2, 4, 4));
    /// ```
    pub fn of_points(points: &[Point2D]) -> BoundingBox {
        if points.is_empty() || points.iter().any(|p| !p.is_finite()) {
            return BoundingBox::default();
        }
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let clamp = |v: f32| (v as f64).clamp(-COORD_LIMIT, COORD_LIMIT) as i64;
        let x = clamp(min_x.floor());
        let y = clamp(min_y.floor());
        BoundingBox {
            x,
            y,
            width: clamp(max_x.ceil()) - x,
            height: clamp(max_y.ceil()) - y,
        }
    }

    /// `true` when the box has non-positive width or height.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// `true` when the whole box lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        let within = |start: i64, extent: i64, limit: usize| {
            start >= 0 && start.checked_add(extent).is_some_and(|end| end <= limit as i64)
        };
        within(self.x, self.width, width) && within(self.y, self.height, height)
    }

    pub fn right(&self) -> i64 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height)
    }

    /// Moves `points` into the box-local frame whose origin is the box corner.
    pub fn to_local<const N: usize>(&self, points: &[Point2D; N]) -> [Point2D; N] {
        points.map(|p| Point2D::new(p.x - self.x as f32, p.y - self.y as f32))
    }
}
