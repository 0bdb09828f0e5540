use crate::point::Point2D;

fn cross(o: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    (a.x as f64 - o.x as f64) * (b.y as f64 - o.y as f64)
        - (a.y as f64 - o.y as f64) * (b.x as f64 - o.x as f64)
}

/// Convex hull of `points` (Andrew's monotone chain).
///
/// Collinear points along hull edges are dropped. Non-finite points are ignored.
/// Fewer than three points are returned when the input has no area, so the hull
/// then fills nothing.
///
/// # Examples
/// ```
/// # use faceswap::convex_hull::convex_hull;
/// # use faceswap::point::Point2D;
/// let pts = [
///     Point2D::new(0.0, 0.0),
///     Point2D::new(4.0, 0.0),
///     Point2D::new(2.0, 1.0),
///     Point2D::new(4.0, 4.0),
///     Point2D::new(0.0, 4.0),
/// ];
/// assert_eq!(convex_hull(&pts).len(), 4);
/// ```
pub fn convex_hull(points: &[Point2D]) -> Vec<Point2D> {
    let mut pts: Vec<Point2D> = points.iter().copied().filter(Point2D::is_finite).collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point2D> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point2D> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }
    // endpoints are shared between the two chains
    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        // all points collinear: the two chains collapse onto the same segment
        lower.truncate(2);
    }
    lower
}

/// Mean of the hull vertices, or of all finite `points` when the hull is empty.
pub fn centroid(hull: &[Point2D], points: &[Point2D]) -> Point2D {
    let source: Vec<&Point2D> = if hull.is_empty() {
        points.iter().filter(|p| p.is_finite()).collect()
    } else {
        hull.iter().collect()
    };
    if source.is_empty() {
        return Point2D::default();
    }
    let n = source.len() as f64;
    let (sx, sy) = source
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    Point2D::new((sx / n) as f32, (sy / n) as f32)
}
