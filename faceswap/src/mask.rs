use crate::bounding_box::BoundingBox;
use crate::photo::Photo;
use crate::point::Point2D;

/// A binary raster, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl Mask {
    /// Creates an empty (all-clear) mask.
    pub fn new(width: usize, height: usize) -> Mask {
        Mask {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Creates a `width` x `height` mask with `polygon` filled in.
    ///
    /// # Examples
    /// ```
    /// # use faceswap::mask::Mask;
    /// # use faceswap::point::Point2D;
    /// let square = [
    ///     Point2D::new(1.0, 1.0),
    ///     Point2D::new(3.0, 1.0),
    ///     Point2D::new(3.0, 3.0),
    ///     Point2D::new(1.0, 3.0),
    /// ];
    /// let mask = Mask::from_polygon(4, 4, &square);
    /// assert_eq!(mask.count_nonzero(), 4);
    /// assert!(mask.get(1, 1) && mask.get(2, 2));
    /// assert!(!mask.get(0, 0) && !mask.get(3, 3));
    /// ```
    pub fn from_polygon(width: usize, height: usize, polygon: &[Point2D]) -> Mask {
        let mut mask = Mask::new(width, height);
        mask.fill_polygon(polygon);
        mask
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `false` for coordinates outside the mask.
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Renders the mask as an opaque image, set pixels white.
    pub fn to_photo(&self) -> Photo {
        Photo::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) {
                [255, 255, 255, 255]
            } else {
                [0, 0, 0, 255]
            }
        })
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Fills `polygon` using the even-odd rule, sampling pixel centres.
    ///
    /// Left and top edges are inclusive, right and bottom edges exclusive: two
    /// polygons sharing an edge never both claim the same pixel, and together
    /// they leave no gap along it.
    pub fn fill_polygon(&mut self, polygon: &[Point2D]) {
        if polygon.len() < 3 || polygon.iter().any(|p| !p.is_finite()) {
            return;
        }
        let mut crossings: Vec<f64> = Vec::with_capacity(polygon.len());
        for row in 0..self.height {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for i in 0..polygon.len() {
                let p0 = polygon[i];
                let p1 = polygon[(i + 1) % polygon.len()];
                let (y0, y1) = (p0.y as f64, p1.y as f64);
                // half-open in y so a shared vertex is counted once
                if (y0 <= yc && yc < y1) || (y1 <= yc && yc < y0) {
                    let t = (yc - y0) / (y1 - y0);
                    crossings.push(p0.x as f64 + t * (p1.x as f64 - p0.x as f64));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().max(0.0);
                let end = (span[1] - 0.5).ceil().min(self.width as f64);
                if start >= end {
                    continue;
                }
                let offset = row * self.width;
                for col in start as usize..end as usize {
                    self.data[offset + col] = true;
                }
            }
        }
    }

    /// Tight pixel rectangle around the set pixels, or `None` if the mask is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut min_x = usize::MAX;
        let mut min_y = usize::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.data[y * self.width + x] {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        if min_x == usize::MAX {
            return None;
        }
        Some(BoundingBox::new(
            min_x as i64,
            min_y as i64,
            (max_x - min_x + 1) as i64,
            (max_y - min_y + 1) as i64,
        ))
    }
}
