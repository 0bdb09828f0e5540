//! # FaceSwap Library
//!
//! The `faceswap` library is a landmark-driven geometric compositing engine. Given the
//! 468-point face landmarks of two photos it moves one face onto the other, and given
//! the landmarks of one photo it places decorative overlays (glasses, hats, mustaches)
//! on the face. Landmark detection itself happens elsewhere; this crate only consumes
//! the points.
//!
//! ## Overview of Modules
//!
//! - **`triangle_mesh`**: Delaunay triangulation of a landmark set, returned as index
//!   triples into the landmark list.
//!
//! - **`affine_warp`**: Warps the pixels of one triangle onto another through the affine
//!   map between them, with bilinear sampling and a per-triangle mask.
//!
//! - **`face_compositor`**: Orchestrates the swap: warps every triangle into a canvas,
//!   masks the destination face by its convex hull and blends the canvas in.
//!
//! - **`seamless_clone`**: Poisson (gradient-domain) blending used by the compositor.
//!
//! - **`anchor_transform`**: Similarity transforms that pin overlay bitmaps to eye, forehead
//!   or mouth landmarks, and the built-in sticker catalog.
//!
//! - **`overlay_state`**: Reducer-style state for editing the overlays placed on a photo.
//!
//! - **`photo`**: The `Photo` RGBA raster with scaling, sampling, cropping and overlay
//!   drawing.
//!
//! - **`affine_transform`**: The `AffineTransform` 2×3 matrix and its constructors.
//!
//! - **`point`**, **`bounding_box`**, **`mask`**, **`convex_hull`**: Geometry primitives.
//!
//! - **`config`**: `SwapConfig`, loaded from JSON and `FACESWAP_*` environment variables.

pub mod affine_transform;
pub mod affine_warp;
pub mod anchor_transform;
pub mod bounding_box;
pub mod config;
pub mod convex_hull;
pub mod face_compositor;
pub mod mask;
pub mod overlay_state;
pub mod photo;
pub mod point;
pub mod seamless_clone;
pub mod triangle_mesh;

mod error;

pub use error::{Error, Result};

pub use affine_transform::AffineTransform;
pub use anchor_transform::{compute_overlay_transform, OverlayAsset, OverlayCategory, PlacedOverlay};
pub use config::{BlendConfig, SwapConfig};
pub use face_compositor::{swap_face, FaceCompositor, SwapIntermediates, SwapOutcome};
pub use photo::Photo;
pub use point::{LandmarkSet, Point2D, LANDMARK_COUNT};
pub use triangle_mesh::{build_triangulation, Triangle, TriangleSet};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
