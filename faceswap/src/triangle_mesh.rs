use std::collections::HashSet;

use kd_tree::{KdPoint, KdTree};
use serde::{Deserialize, Serialize};

use crate::point::Point2D;

/// Default squared distance (px²) within which a triangulation vertex is
/// matched back to an input point.
pub const DEFAULT_MATCH_TOLERANCE_SQ: f32 = 16.0;

/// Three distinct indices into a landmark list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triangle(pub usize, pub usize, pub usize);

/// Triangles of a mesh. Order does not affect compositing, but the builder
/// always emits the same order for the same input.
pub type TriangleSet = Vec<Triangle>;

impl Triangle {
    /// Returns `None` unless the three indices are mutually distinct.
    pub fn new(a: usize, b: usize, c: usize) -> Option<Triangle> {
        (a != b && b != c && a != c).then_some(Triangle(a, b, c))
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.0, self.1, self.2]
    }

    /// Distinct indices, all below `len`.
    pub fn is_valid_for(&self, len: usize) -> bool {
        self.0 != self.1 && self.1 != self.2 && self.0 != self.2 && self.indices().iter().all(|&i| i < len)
    }
}

/// An input point remembered together with its position in the input list.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    index: usize,
    coords: [f32; 2],
}

impl KdPoint for IndexedPoint {
    type Scalar = f32;
    type Dim = typenum::U2;
    fn at(&self, k: usize) -> f32 {
        self.coords[k]
    }
}

fn coordinate_key(p: &Point2D) -> (u32, u32) {
    // adding 0.0 folds -0.0 into 0.0
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

fn inside_rect(p: &Point2D, width: usize, height: usize) -> bool {
    p.x >= 0.0 && p.x < width as f32 && p.y >= 0.0 && p.y < height as f32
}

/// Finite points with duplicates removed; the first occurrence keeps its index.
fn unique_points<'a>(points: impl Iterator<Item = (usize, &'a Point2D)>) -> Vec<IndexedPoint> {
    let mut seen = HashSet::new();
    points
        .filter(|(_, p)| p.is_finite() && seen.insert(coordinate_key(p)))
        .map(|(index, p)| IndexedPoint {
            index,
            coords: [p.x, p.y],
        })
        .collect()
}

/// Builds Delaunay triangle meshes over landmark sets.
///
/// # How It Works
/// 1. Input points inside `[0, width) x [0, height)` are de-duplicated and
///    triangulated with the Bowyer-Watson algorithm, in input order.
/// 2. Each emitted triangle arrives as three raw coordinates. Every vertex is
///    mapped back to the nearest input point (k-d tree lookup); triangles with
///    a vertex farther than `match_tolerance_sq` from any input point, or
///    whose vertices collapse onto fewer than three input points, are dropped.
///
/// Empty, collinear or fewer-than-three point sets give an empty mesh. Callers
/// must handle zero triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleMeshBuilder {
    /// Squared distance (px²) below which a vertex matches an input point.
    pub match_tolerance_sq: f32,
}

impl Default for TriangleMeshBuilder {
    fn default() -> Self {
        TriangleMeshBuilder {
            match_tolerance_sq: DEFAULT_MATCH_TOLERANCE_SQ,
        }
    }
}

impl TriangleMeshBuilder {
    pub fn new(match_tolerance_sq: f32) -> Self {
        TriangleMeshBuilder { match_tolerance_sq }
    }

    /// Triangulates `points` within the `width` x `height` rectangle.
    ///
    /// # Returns
    /// Triangles whose three indices are distinct and index into `points`.
    pub fn build(&self, width: usize, height: usize, points: &[Point2D]) -> TriangleSet {
        let sites = unique_points(
            points
                .iter()
                .enumerate()
                .filter(|(_, p)| inside_rect(p, width, height)),
        );
        if sites.len() < 3 {
            tracing::debug!(points = points.len(), "too few points to triangulate");
            return Vec::new();
        }

        let coords: Vec<(f64, f64)> = sites
            .iter()
            .map(|s| (s.coords[0] as f64, s.coords[1] as f64))
            .collect();
        let raw: Vec<[Point2D; 3]> = bowyer_watson(&coords)
            .into_iter()
            .map(|tri| tri.map(|i| Point2D::new(sites[i].coords[0], sites[i].coords[1])))
            .collect();

        let triangles = match_triangle_indices(&raw, points, width, height, self.match_tolerance_sq);
        tracing::debug!(
            triangles = triangles.len(),
            width,
            height,
            "Delaunay triangles calculated"
        );
        triangles
    }
}

/// Triangulates `points` with the default matching tolerance of 16 px².
///
/// # Examples
/// ```
/// # use faceswap::triangle_mesh::build_triangulation;
/// # use faceswap::point::Point2D;
/// let pts = [
///     Point2D::new(10.0, 10.0),
///     Point2D::new(90.0, 10.0),
///     Point2D::new(90.0, 90.0),
///     Point2D::new(10.0, 90.0),
///     Point2D::new(50.0, 50.0),
/// ];
/// let triangles = build_triangulation(100, 100, &pts);
/// assert_eq!(triangles.len(), 4);
/// assert!(triangles.iter().all(|t| t.indices().contains(&4)));
/// ```
pub fn build_triangulation(width: usize, height: usize, points: &[Point2D]) -> TriangleSet {
    TriangleMeshBuilder::default().build(width, height, points)
}

/// Maps triangles given as raw coordinates back onto indices into `points`.
///
/// Triangles with any vertex outside `[0, width) x [0, height)` are discarded
/// before matching. Each remaining vertex takes the index of its nearest point
/// in `points` (the first occurrence, for duplicated coordinates) if the
/// squared distance is below `match_tolerance_sq`; otherwise the triangle is
/// discarded. A triangle is also discarded when two of its vertices resolve to
/// the same index.
pub fn match_triangle_indices(
    raw_triangles: &[[Point2D; 3]],
    points: &[Point2D],
    width: usize,
    height: usize,
    match_tolerance_sq: f32,
) -> TriangleSet {
    let candidates = unique_points(points.iter().enumerate());
    if candidates.is_empty() {
        return Vec::new();
    }
    let kdtree = KdTree::build_by_ordered_float(candidates);

    let mut triangles = Vec::with_capacity(raw_triangles.len());
    'triangles: for raw in raw_triangles {
        if !raw.iter().all(|p| inside_rect(p, width, height)) {
            continue;
        }
        let mut indices = [0usize; 3];
        for (slot, vertex) in indices.iter_mut().zip(raw.iter()) {
            let query = IndexedPoint {
                index: usize::MAX,
                coords: [vertex.x, vertex.y],
            };
            match kdtree.nearest(&query) {
                Some(found) if found.squared_distance < match_tolerance_sq => *slot = found.item.index,
                _ => continue 'triangles,
            }
        }
        if let Some(triangle) = Triangle::new(indices[0], indices[1], indices[2]) {
            triangles.push(triangle);
        }
    }
    triangles
}

/// Twice the signed area of `(a, b, c)`; positive when counter-clockwise
/// in a y-up frame.
fn orient2d(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Whether `d` lies strictly inside the circumcircle of the positively
/// oriented triangle `(a, b, c)`.
fn in_circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> bool {
    let (adx, ady) = (a.0 - d.0, a.1 - d.1);
    let (bdx, bdy) = (b.0 - d.0, b.1 - d.1);
    let (cdx, cdy) = (c.0 - d.0, c.1 - d.1);
    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;
    let det = adx * (bdy * clift - cdy * blift) - ady * (bdx * clift - cdx * blift)
        + alift * (bdx * cdy - cdx * bdy);
    det > 0.0
}

/// Bowyer-Watson Delaunay triangulation of distinct `sites`.
///
/// Returns positively oriented index triples into `sites`. Insertion and
/// output order depend only on the input order.
fn bowyer_watson(sites: &[(f64, f64)]) -> Vec<[usize; 3]> {
    let n = sites.len();
    if n < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in sites {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let delta = (max_x - min_x).max(max_y - min_y).max(1.0);
    let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

    // Equilateral super-triangle whose incircle (radius r) holds every site.
    let r = 100.0 * delta;
    let sqrt_3 = 3.0f64.sqrt();
    let mut vertices = sites.to_vec();
    vertices.push((cx, cy + 2.0 * r));
    vertices.push((cx - sqrt_3 * r, cy - r));
    vertices.push((cx + sqrt_3 * r, cy - r));
    let (s0, s1, s2) = (n, n + 1, n + 2);
    let mut triangles = if orient2d(vertices[s0], vertices[s1], vertices[s2]) > 0.0 {
        vec![[s0, s1, s2]]
    } else {
        vec![[s0, s2, s1]]
    };

    let mut is_bad = Vec::new();
    let mut cavity_edges: Vec<(usize, usize)> = Vec::new();
    for pid in 0..n {
        let p = vertices[pid];

        // Triangles whose circumcircle contains p
        is_bad.clear();
        is_bad.extend(triangles.iter().map(|t: &[usize; 3]| {
            in_circumcircle(vertices[t[0]], vertices[t[1]], vertices[t[2]], p)
        }));
        if !is_bad.iter().any(|&b| b) {
            continue;
        }

        // The cavity boundary consists of the directed edges whose twin is not
        // also an edge of a removed triangle.
        cavity_edges.clear();
        for (t, _) in triangles.iter().zip(is_bad.iter()).filter(|(_, &bad)| bad) {
            cavity_edges.extend([(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]);
        }
        let edge_set: HashSet<(usize, usize)> = cavity_edges.iter().copied().collect();

        let mut kept = Vec::with_capacity(triangles.len() + 2);
        for (t, &bad) in triangles.iter().zip(is_bad.iter()) {
            if !bad {
                kept.push(*t);
            }
        }
        for &(a, b) in &cavity_edges {
            if !edge_set.contains(&(b, a)) {
                kept.push([a, b, pid]);
            }
        }
        triangles = kept;
    }

    triangles
        .into_iter()
        .filter(|t| t.iter().all(|&i| i < n))
        .filter(|t| orient2d(vertices[t[0]], vertices[t[1]], vertices[t[2]]) > 1e-9)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_well_formed(triangles: &[Triangle], len: usize) {
        for t in triangles {
            assert!(t.is_valid_for(len), "bad triangle {t:?} for {len} points");
        }
    }

    #[test]
    fn empty_and_tiny_inputs_give_no_triangles() {
        assert!(build_triangulation(100, 100, &[]).is_empty());
        let two = [Point2D::new(1.0, 1.0), Point2D::new(5.0, 5.0)];
        assert!(build_triangulation(100, 100, &two).is_empty());
    }

    #[test]
    fn collinear_points_give_no_triangles() {
        let line: Vec<Point2D> = (0..10).map(|i| Point2D::new(5.0 + i as f32 * 7.0, 20.0)).collect();
        assert!(build_triangulation(100, 100, &line).is_empty());
    }

    #[test]
    fn random_convex_configurations_give_valid_indices() {
        let mut rng = StdRng::seed_from_u64(468);
        for round in 0..20 {
            // points on a circle plus scattered interior points
            let mut pts = Vec::new();
            let ring = 8 + round;
            for i in 0..ring {
                let a = i as f32 / ring as f32 * std::f32::consts::TAU;
                pts.push(Point2D::new(200.0 + 150.0 * a.cos(), 200.0 + 150.0 * a.sin()));
            }
            for _ in 0..40 {
                pts.push(Point2D::new(
                    rng.random_range(100.0..300.0),
                    rng.random_range(100.0..300.0),
                ));
            }
            let triangles = build_triangulation(400, 400, &pts);
            assert!(!triangles.is_empty());
            assert_well_formed(&triangles, pts.len());
        }
    }

    #[test]
    fn triangles_are_delaunay() {
        let mut rng = StdRng::seed_from_u64(7);
        let pts: Vec<Point2D> = (0..60)
            .map(|_| Point2D::new(rng.random_range(0.0..500.0), rng.random_range(0.0..500.0)))
            .collect();
        let triangles = build_triangulation(500, 500, &pts);
        let as_f64 = |p: Point2D| (p.x as f64, p.y as f64);
        for t in &triangles {
            let [a, b, c] = t.indices().map(|i| as_f64(pts[i]));
            let (a, b, c) = if orient2d(a, b, c) > 0.0 { (a, b, c) } else { (a, c, b) };
            for (i, p) in pts.iter().enumerate() {
                if t.indices().contains(&i) {
                    continue;
                }
                assert!(!in_circumcircle(a, b, c, as_f64(*p)), "point {i} inside circumcircle of {t:?}");
            }
        }
    }

    #[test]
    fn output_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(99);
        let pts: Vec<Point2D> = (0..100)
            .map(|_| Point2D::new(rng.random_range(0.0..640.0), rng.random_range(0.0..480.0)))
            .collect();
        assert_eq!(build_triangulation(640, 480, &pts), build_triangulation(640, 480, &pts));
    }

    #[test]
    fn duplicates_and_outside_points_are_never_referenced() {
        let pts = [
            Point2D::new(10.0, 10.0),
            Point2D::new(60.0, 10.0),
            Point2D::new(35.0, 50.0),
            Point2D::new(60.0, 10.0),
            Point2D::new(150.0, 20.0),
            Point2D::new(40.0, 25.0),
        ];
        let triangles = build_triangulation(100, 100, &pts);
        assert_eq!(triangles.len(), 3);
        assert_well_formed(&triangles, pts.len());
        for t in &triangles {
            assert!(!t.indices().contains(&3), "duplicate point used");
            assert!(!t.indices().contains(&4), "point outside the rectangle used");
        }
    }

    #[test]
    fn matching_maps_vertices_back_within_tolerance() {
        let pts = [
            Point2D::new(10.0, 10.0),
            Point2D::new(50.0, 10.0),
            Point2D::new(30.0, 40.0),
            Point2D::new(31.0, 41.0),
        ];
        let raw = [
            // each vertex off by about one pixel
            [Point2D::new(11.0, 10.5), Point2D::new(49.2, 9.0), Point2D::new(29.0, 39.0)],
            // third vertex 5px away from everything
            [Point2D::new(10.0, 10.0), Point2D::new(50.0, 10.0), Point2D::new(30.0, 25.0)],
            // two vertices collapse onto point 0
            [Point2D::new(10.0, 10.0), Point2D::new(11.0, 11.0), Point2D::new(30.0, 40.0)],
            // outside the rectangle
            [Point2D::new(10.0, 10.0), Point2D::new(50.0, 10.0), Point2D::new(30.0, 140.0)],
        ];
        let triangles = match_triangle_indices(&raw, &pts, 100, 100, DEFAULT_MATCH_TOLERANCE_SQ);
        assert_eq!(triangles, vec![Triangle(0, 1, 2)]);
    }

    #[test]
    fn every_vertex_matches_an_input_point() {
        let mut rng = StdRng::seed_from_u64(12);
        let pts: Vec<Point2D> = (0..80)
            .map(|_| Point2D::new(rng.random_range(0.0..300.0), rng.random_range(0.0..300.0)))
            .collect();
        let triangles = build_triangulation(300, 300, &pts);
        assert!(!triangles.is_empty());
        // the same triangles survive an explicit round trip through their coordinates
        let raw: Vec<[Point2D; 3]> = triangles.iter().map(|t| t.indices().map(|i| pts[i])).collect();
        assert_eq!(match_triangle_indices(&raw, &pts, 300, 300, DEFAULT_MATCH_TOLERANCE_SQ), triangles);
    }

    #[test]
    fn triangle_constructor_requires_distinct_indices() {
        assert!(Triangle::new(1, 1, 2).is_none());
        assert_eq!(Triangle::new(3, 1, 2), Some(Triangle(3, 1, 2)));
        assert!(!Triangle(0, 1, 5).is_valid_for(5));
    }
}
