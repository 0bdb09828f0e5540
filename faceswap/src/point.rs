use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::triangle_mesh::Triangle;
use crate::Result;

/// Number of points produced per face by the landmark model.
pub const LANDMARK_COUNT: usize = 468;

/// A 2D point in pixel space.
///
/// Pixel `(i, j)` of an image covers `[i, i + 1) x [j, j + 1)`, so its centre
/// sits at `(i + 0.5, j + 0.5)`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Point2D { x, y }
    }

    /// Euclidean distance to `other`.
    ///
    /// # Examples
    /// ```
    /// # use faceswap::point::Point2D;
    /// let a = Point2D::new(0.0, 0.0);
    /// let b = Point2D::new(3.0, 4.0);
    /// assert_eq!(a.distance(&b), 5.0);
    /// ```
    pub fn distance(&self, other: &Point2D) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: &Point2D) -> Point2D {
        Point2D::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Direction from `self` to `other`, in degrees, as `atan2(dy, dx)`.
    ///
    /// Image space has `y` pointing down, so positive angles turn clockwise on screen.
    pub fn angle_degrees_to(&self, other: &Point2D) -> f32 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Ordered landmarks of one detected face.
///
/// Index `i` denotes the same anatomical location for every detection made
/// with the same model. The set is produced once per face and only read afterwards;
/// the operations below that change coordinates return a new set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Point2D>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point2D>) -> Self {
        LandmarkSet { points }
    }

    pub fn from_xy(coords: &[(f32, f32)]) -> Self {
        LandmarkSet {
            points: coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect(),
        }
    }

    /// Parses a JSON array of `{"x": .., "y": ..}` objects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the set carries the full [`LANDMARK_COUNT`] points.
    pub fn is_complete(&self) -> bool {
        self.points.len() >= LANDMARK_COUNT
    }

    pub fn get(&self, index: usize) -> Option<Point2D> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Keeps at most the first `count` landmarks. Some detectors append extra
    /// refinement points (e.g. irises) after the base mesh.
    pub fn truncated(&self, count: usize) -> LandmarkSet {
        LandmarkSet {
            points: self.points.iter().take(count).copied().collect(),
        }
    }

    /// Maps the landmarks onto an image resized by `(scale_x, scale_y)`.
    ///
    /// # Examples
    /// ```
    /// # use faceswap::point::{LandmarkSet, Point2D};
    /// let set = LandmarkSet::from_xy(&[(10.0, 20.0)]);
    /// let scaled = set.scaled(2.0, 0.5);
    /// assert_eq!(scaled[0], Point2D::new(20.0, 10.0));
    /// ```
    pub fn scaled(&self, scale_x: f32, scale_y: f32) -> LandmarkSet {
        LandmarkSet {
            points: self
                .points
                .iter()
                .map(|p| Point2D::new(p.x * scale_x, p.y * scale_y))
                .collect(),
        }
    }

    /// Returns the three vertices referenced by `triangle`.
    ///
    /// # Panics
    /// Panics if any index of `triangle` is out of range.
    pub fn triangle(&self, triangle: &Triangle) -> [Point2D; 3] {
        let [a, b, c] = triangle.indices();
        [self.points[a], self.points[b], self.points[c]]
    }
}

impl Index<usize> for LandmarkSet {
    type Output = Point2D;

    fn index(&self, index: usize) -> &Point2D {
        &self.points[index]
    }
}

impl From<Vec<Point2D>> for LandmarkSet {
    fn from(points: Vec<Point2D>) -> Self {
        LandmarkSet::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_follows_image_axes() {
        let a = Point2D::new(0.0, 0.0);
        assert_eq!(a.angle_degrees_to(&Point2D::new(10.0, 0.0)), 0.0);
        assert!((a.angle_degrees_to(&Point2D::new(0.0, 10.0)) - 90.0).abs() < 1e-5);
        assert!((a.angle_degrees_to(&Point2D::new(-10.0, 0.0)).abs() - 180.0).abs() < 1e-5);
    }

    #[test]
    fn truncation_keeps_leading_points() {
        let set = LandmarkSet::from_xy(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        let head = set.truncated(2);
        assert_eq!(head.len(), 2);
        assert_eq!(head[1], Point2D::new(2.0, 2.0));
        assert!(!head.is_complete());
    }

    #[test]
    fn json_round_trip_uses_xy_objects() {
        let set = LandmarkSet::from_json_str(r#"[{"x": 1.5, "y": 2.0}, {"x": 3.0, "y": 4.25}]"#)
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[1], Point2D::new(3.0, 4.25));
        let json = set.to_json_string().unwrap();
        assert_eq!(LandmarkSet::from_json_str(&json).unwrap(), set);
    }

    #[test]
    fn triangle_lookup_returns_vertices_in_order() {
        let set = LandmarkSet::from_xy(&[(0.0, 0.0), (5.0, 0.0), (0.0, 5.0)]);
        let tri = Triangle(2, 0, 1);
        assert_eq!(
            set.triangle(&tri),
            [Point2D::new(0.0, 5.0), Point2D::new(0.0, 0.0), Point2D::new(5.0, 0.0)]
        );
    }
}
