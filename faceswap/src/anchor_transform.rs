use serde::{Deserialize, Serialize};

use crate::affine_transform::AffineTransform;
use crate::photo::Photo;
use crate::point::Point2D;

/// Face features an overlay can be anchored to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayCategory {
    Glasses,
    Hat,
    Mustache,
}

impl OverlayCategory {
    /// Landmark indices of the face line the overlay follows (first, second).
    pub fn landmark_pair(&self) -> (usize, usize) {
        match self {
            OverlayCategory::Glasses => (33, 263),
            OverlayCategory::Hat => (338, 297),
            OverlayCategory::Mustache => (82, 312),
        }
    }

    /// Anchor points as fractions of the asset's width and height.
    pub fn default_anchor_fractions(&self) -> (Point2D, Point2D) {
        match self {
            OverlayCategory::Glasses => (Point2D::new(0.25, 0.5), Point2D::new(0.75, 0.5)),
            OverlayCategory::Hat => (Point2D::new(0.25, 0.9), Point2D::new(0.75, 0.9)),
            OverlayCategory::Mustache => (Point2D::new(0.2, 0.6), Point2D::new(0.8, 0.6)),
        }
    }

    /// Minimum landmark count needed to place the overlay.
    pub fn required_landmarks(&self) -> usize {
        let (a, b) = self.landmark_pair();
        a.max(b) + 1
    }
}

/// An overlay bitmap's placement metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayAsset {
    pub id: String,
    pub width: usize,
    pub height: usize,
    /// Anchors as fractions of the asset size. Only glasses use them; other
    /// categories always anchor at their fixed fractions.
    #[serde(default)]
    pub left_anchor: Option<Point2D>,
    #[serde(default)]
    pub right_anchor: Option<Point2D>,
}

impl OverlayAsset {
    pub fn new(id: impl Into<String>, width: usize, height: usize) -> Self {
        OverlayAsset {
            id: id.into(),
            width,
            height,
            left_anchor: None,
            right_anchor: None,
        }
    }

    pub fn with_anchors(mut self, left: Point2D, right: Point2D) -> Self {
        self.left_anchor = Some(left);
        self.right_anchor = Some(right);
        self
    }

    /// The two anchors in asset pixel coordinates.
    pub fn anchor_points(&self, category: OverlayCategory) -> (Point2D, Point2D) {
        let (default_left, default_right) = category.default_anchor_fractions();
        let (left, right) = match category {
            OverlayCategory::Glasses => (
                self.left_anchor.unwrap_or(default_left),
                self.right_anchor.unwrap_or(default_right),
            ),
            _ => (default_left, default_right),
        };
        let (w, h) = (self.width as f32, self.height as f32);
        (Point2D::new(left.x * w, left.y * h), Point2D::new(right.x * w, right.y * h))
    }
}

/// Computes the similarity transform that places an overlay on a face.
///
/// The first asset anchor is moved to the origin, scaled so the anchor pair
/// spans the face landmark pair (times `user_scale`), rotated to follow the
/// face line (plus `user_rotation` degrees) and moved to the target point:
///
/// | Category | Target |
/// |---|---|
/// | glasses | midpoint of the eye landmarks |
/// | hat | left forehead landmark, raised by `0.9 * asset height * scale` |
/// | mustache | left mouth landmark |
///
/// `(offset_x, offset_y)` is added to the target in every case.
///
/// # Returns
/// The identity transform when `landmarks` is too short for the category or
/// the asset anchors coincide.
///
/// # Examples
/// ```
/// # use faceswap::anchor_transform::{compute_overlay_transform, OverlayAsset, OverlayCategory};
/// # use faceswap::point::Point2D;
/// let mut landmarks = vec![Point2D::default(); 468];
/// landmarks[33] = Point2D::new(100.0, 200.0);
/// landmarks[263] = Point2D::new(200.0, 200.0);
/// let asset = OverlayAsset::new("glasses", 100, 50);
/// let t = compute_overlay_transform(OverlayCategory::Glasses, &asset, &landmarks, 0.0, 0.0, 1.0, 0.0);
/// assert!((t.scale_factor() - 2.0).abs() < 1e-5);
/// assert_eq!(t.transform(25.0, 25.0), (150.0, 200.0));
/// ```
pub fn compute_overlay_transform(
    category: OverlayCategory,
    asset: &OverlayAsset,
    landmarks: &[Point2D],
    offset_x: f32,
    offset_y: f32,
    user_scale: f32,
    user_rotation: f32,
) -> AffineTransform {
    if landmarks.len() < category.required_landmarks() {
        return AffineTransform::identity();
    }
    let (first, second) = category.landmark_pair();
    let (face_a, face_b) = (landmarks[first], landmarks[second]);
    let (anchor_a, anchor_b) = asset.anchor_points(category);

    let asset_dist = anchor_a.distance(&anchor_b);
    if asset_dist <= 0.0 || !asset_dist.is_finite() {
        return AffineTransform::identity();
    }
    let scale = face_a.distance(&face_b) / asset_dist * user_scale;
    let rotation = face_a.angle_degrees_to(&face_b) - anchor_a.angle_degrees_to(&anchor_b) + user_rotation;

    let target = match category {
        OverlayCategory::Glasses => face_a.midpoint(&face_b),
        OverlayCategory::Hat => Point2D::new(face_a.x, face_a.y - asset.height as f32 * scale * 0.9),
        OverlayCategory::Mustache => face_a,
    };

    AffineTransform::translation(-anchor_a.x, -anchor_a.y)
        .post_scale(scale)
        .post_rotate(rotation)
        .post_translate(target.x + offset_x, target.y + offset_y)
}

/// Transform for an overlay when no face was found: the asset centre goes to
/// the image centre, shifted by the offset.
pub fn centered_overlay_transform(
    asset: &OverlayAsset,
    image_width: usize,
    image_height: usize,
    offset_x: f32,
    offset_y: f32,
    user_scale: f32,
    user_rotation: f32,
) -> AffineTransform {
    AffineTransform::translation(-(asset.width as f32) / 2.0, -(asset.height as f32) / 2.0)
        .post_scale(user_scale)
        .post_rotate(user_rotation)
        .post_translate(
            image_width as f32 / 2.0 + offset_x,
            image_height as f32 / 2.0 + offset_y,
        )
}

/// An overlay placed by the user, with its adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOverlay {
    pub category: OverlayCategory,
    pub asset: OverlayAsset,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Degrees.
    #[serde(default)]
    pub rotation: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl PlacedOverlay {
    /// A freshly placed overlay: no offset, unit scale, no rotation.
    pub fn new(category: OverlayCategory, asset: OverlayAsset) -> Self {
        PlacedOverlay {
            category,
            asset,
            offset_x: 0.0,
            offset_y: 0.0,
            scale: default_scale(),
            rotation: 0.0,
        }
    }

    pub fn transform(&self, landmarks: &[Point2D]) -> AffineTransform {
        compute_overlay_transform(
            self.category,
            &self.asset,
            landmarks,
            self.offset_x,
            self.offset_y,
            self.scale,
            self.rotation,
        )
    }

    /// Draws `bitmap` onto `photo`, anchored to `landmarks` when a face is
    /// known and centred on the photo otherwise.
    pub fn render(&self, photo: &mut Photo, bitmap: &Photo, landmarks: Option<&[Point2D]>) {
        let transform = match landmarks {
            Some(points) if !points.is_empty() => self.transform(points),
            _ => centered_overlay_transform(
                &self.asset,
                photo.width,
                photo.height,
                self.offset_x,
                self.offset_y,
                self.scale,
                self.rotation,
            ),
        };
        tracing::debug!(id = %self.asset.id, ?transform, "rendering overlay");
        photo.draw_overlay(bitmap, &transform);
    }
}

/// A built-in sticker.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub category: OverlayCategory,
    pub left_anchor: Option<Point2D>,
    pub right_anchor: Option<Point2D>,
}

impl CatalogEntry {
    /// Metadata for this sticker drawn from a `width` x `height` bitmap.
    pub fn asset(&self, width: usize, height: usize) -> OverlayAsset {
        OverlayAsset {
            id: self.id.to_string(),
            width,
            height,
            left_anchor: self.left_anchor,
            right_anchor: self.right_anchor,
        }
    }
}

pub static STICKER_CATALOG: [CatalogEntry; 3] = [
    CatalogEntry {
        id: "hat",
        label: "Hat",
        category: OverlayCategory::Hat,
        left_anchor: None,
        right_anchor: None,
    },
    CatalogEntry {
        id: "glasses",
        label: "Glasses",
        category: OverlayCategory::Glasses,
        left_anchor: Some(Point2D::new(0.276, 0.466)),
        right_anchor: Some(Point2D::new(0.778, 0.466)),
    },
    CatalogEntry {
        id: "mustache",
        label: "Mustache",
        category: OverlayCategory::Mustache,
        left_anchor: None,
        right_anchor: None,
    },
];

pub fn find_sticker(id: &str) -> Option<&'static CatalogEntry> {
    STICKER_CATALOG.iter().find(|entry| entry.id == id)
}
