use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Insufficient {role} landmarks: expected at least {expected}, got {actual}")]
    InsufficientLandmarks {
        role: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Triangle ({a}, {b}, {c}) references a landmark outside 0..{len}")]
    TriangleIndexOutOfRange {
        a: usize,
        b: usize,
        c: usize,
        len: usize,
    },

    #[error("Empty {role} image ({width}x{height})")]
    EmptyImage {
        role: &'static str,
        width: usize,
        height: usize,
    },

    #[error("Invalid image buffer: {len} bytes for a {width}x{height} RGBA image")]
    InvalidImageBuffer {
        len: usize,
        width: usize,
        height: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
