use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use image::{open, GenericImageView};
use tracing_subscriber::EnvFilter;

use faceswap::anchor_transform::{find_sticker, OverlayAsset, OverlayCategory, PlacedOverlay};
use faceswap::photo::Photo;
use faceswap::{FaceCompositor, LandmarkSet, SwapConfig, TriangleSet, LANDMARK_COUNT};

/// Command line arguments structure.
#[derive(Parser, Debug)]
#[command(author, version, about = "CLI for landmark-driven face swapping and sticker placement.")]
struct Args {
    /// JSON configuration file (FACESWAP_* environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Triangulate a landmark set and write the triangles as JSON index triples
    Triangulate {
        /// Image the landmarks belong to (only its size is used)
        #[arg(long)]
        image: PathBuf,

        /// Landmarks as a JSON array of {"x", "y"} objects
        #[arg(long)]
        landmarks: PathBuf,

        /// Output file; printed to stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Move the face of the source photo onto the destination photo
    Swap {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        dest: PathBuf,

        /// Landmarks of the source photo, in its own pixel coordinates
        #[arg(long)]
        source_landmarks: PathBuf,

        #[arg(long)]
        dest_landmarks: PathBuf,

        /// Precomputed triangles (JSON); the destination landmarks are triangulated otherwise
        #[arg(long)]
        triangles: Option<PathBuf>,

        #[arg(long, default_value = "swapped.png")]
        output: PathBuf,

        /// Also write the scaled source, hull mask and pre-blend canvas here
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },

    /// Draw a sticker onto a photo, anchored to the face if landmarks are given
    Sticker {
        #[arg(long)]
        image: PathBuf,

        /// Sticker bitmap (PNG with alpha)
        #[arg(long)]
        sticker: PathBuf,

        /// Face feature the sticker follows
        #[arg(long, value_enum)]
        kind: StickerKind,

        /// Landmarks of the photo; without them the sticker is centred
        #[arg(long)]
        landmarks: Option<PathBuf>,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_x: f32,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_y: f32,

        #[arg(long, default_value_t = 1.0)]
        scale: f32,

        /// Extra rotation in degrees
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        rotation: f32,

        #[arg(long, default_value = "sticker.png")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StickerKind {
    Glasses,
    Hat,
    Mustache,
}

impl StickerKind {
    fn category(self) -> OverlayCategory {
        match self {
            StickerKind::Glasses => OverlayCategory::Glasses,
            StickerKind::Hat => OverlayCategory::Hat,
            StickerKind::Mustache => OverlayCategory::Mustache,
        }
    }

    fn catalog_id(self) -> &'static str {
        match self {
            StickerKind::Glasses => "glasses",
            StickerKind::Hat => "hat",
            StickerKind::Mustache => "mustache",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = SwapConfig::load(args.config.as_deref()).context("could not load configuration")?;
    let compositor = FaceCompositor::new(config);

    match args.command {
        Command::Triangulate {
            image,
            landmarks,
            output,
        } => {
            let photo = read_photo(&image)?;
            let landmarks = read_landmarks(&landmarks)?;
            let triangles = compositor.triangulate(&photo, &landmarks);
            let json = serde_json::to_string(&triangles)?;
            match output {
                Some(path) => {
                    fs::write(&path, json).with_context(|| format!("could not write {}", path.display()))?;
                    tracing::info!(count = triangles.len(), path = %path.display(), "triangles written");
                }
                None => println!("{json}"),
            }
        }

        Command::Swap {
            source,
            dest,
            source_landmarks,
            dest_landmarks,
            triangles,
            output,
            debug_dir,
        } => {
            let source = read_photo(&source)?;
            let dest = read_photo(&dest)?;
            let source_landmarks = read_landmarks(&source_landmarks)?;
            let dest_landmarks = read_landmarks(&dest_landmarks)?;
            let triangles: TriangleSet = match triangles {
                Some(path) => serde_json::from_str(&read_text(&path)?)
                    .with_context(|| format!("invalid triangle file {}", path.display()))?,
                None => compositor.triangulate(&dest, &dest_landmarks),
            };

            let compositor = FaceCompositor::new(SwapConfig {
                keep_intermediates: debug_dir.is_some(),
                ..config
            });
            let outcome = compositor.swap_face(&source, &dest, &source_landmarks, &dest_landmarks, &triangles)?;
            if !outcome.blended {
                tracing::warn!(
                    attempted = outcome.triangles_attempted,
                    warped = outcome.triangles_warped,
                    "face swap failed, writing the destination unchanged"
                );
            }
            if let (Some(dir), Some(stages)) = (debug_dir, outcome.intermediates) {
                fs::create_dir_all(&dir).with_context(|| format!("could not create {}", dir.display()))?;
                save_photo(stages.scaled_source, &dir.join("scaled_source.png"))?;
                save_photo(stages.hull_mask.to_photo(), &dir.join("hull_mask.png"))?;
                save_photo(stages.canvas, &dir.join("canvas.png"))?;
            }
            save_photo(outcome.image, &output)?;
        }

        Command::Sticker {
            image,
            sticker,
            kind,
            landmarks,
            offset_x,
            offset_y,
            scale,
            rotation,
            output,
        } => {
            let mut photo = read_photo(&image)?;
            let bitmap = read_photo(&sticker)?;
            let landmarks = landmarks.map(|path| read_landmarks(&path)).transpose()?;

            let asset = match find_sticker(kind.catalog_id()) {
                Some(entry) => entry.asset(bitmap.width, bitmap.height),
                None => OverlayAsset::new(kind.catalog_id(), bitmap.width, bitmap.height),
            };
            let placed = PlacedOverlay {
                offset_x,
                offset_y,
                scale: scale.max(0.0),
                rotation,
                ..PlacedOverlay::new(kind.category(), asset)
            };
            placed.render(&mut photo, &bitmap, landmarks.as_ref().map(|set| set.points()));
            save_photo(photo, &output)?;
        }
    }

    tracing::info!("Done.");
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
}

/// Reads a landmark file, keeping only the base face mesh.
fn read_landmarks(path: &Path) -> Result<LandmarkSet> {
    let landmarks = LandmarkSet::from_json_str(&read_text(path)?)
        .with_context(|| format!("invalid landmark file {}", path.display()))?;
    if landmarks.is_empty() {
        bail!("no landmarks in {}", path.display());
    }
    tracing::debug!(count = landmarks.len(), path = %path.display(), "landmarks read");
    Ok(landmarks.truncated(LANDMARK_COUNT))
}

pub fn save_photo(photo: Photo, filename: &Path) -> Result<()> {
    tracing::info!("Writing image {}", filename.display());
    let (width, height) = (photo.width as u32, photo.height as u32);
    let img = image::RgbaImage::from_raw(width, height, photo.img_data)
        .context("pixel buffer does not match the image size")?;
    img.save(filename)
        .with_context(|| format!("could not write {}", filename.display()))?;
    Ok(())
}

pub fn read_photo(filename: &Path) -> Result<Photo> {
    tracing::info!("Reading image file: {}", filename.display());
    let img = open(filename).with_context(|| format!("could not load image {}", filename.display()))?;
    let pixel_data = img.to_rgba8().into_raw();
    let photo = Photo::from_raw(img.width() as usize, img.height() as usize, pixel_data)
        .with_context(|| format!("unexpected pixel layout in {}", filename.display()))?;
    Ok(photo)
}
