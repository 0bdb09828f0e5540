use std::{fs, path::Path};

use crate::triangle_mesh::DEFAULT_MATCH_TOLERANCE_SQ;
use crate::Result;

/// Environment variable prefix; nested keys are separated by `__`
/// (`FACESWAP_BLEND__MAX_ITERATIONS=500`).
pub const ENV_PREFIX: &str = "FACESWAP";

/// Tuning for the face swap pipeline.
#[derive(serde::Deserialize, serde::Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct SwapConfig {
    /// Squared distance (px²) for mapping triangulation vertices back to landmarks.
    pub match_tolerance_sq: f32,
    /// Warp triangles on the rayon thread pool.
    pub parallel_warp: bool,
    /// Return the scaled source, hull mask and pre-blend canvas with the result.
    pub keep_intermediates: bool,
    pub blend: BlendConfig,
}

/// Iteration controls for the Poisson solver behind seamless cloning.
#[derive(serde::Deserialize, serde::Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct BlendConfig {
    pub max_iterations: usize,
    /// Stop once no pixel changes by more than this between sweeps.
    pub tolerance: f64,
    /// Over-relaxation factor, in `(0, 2)`.
    pub relaxation: f64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            match_tolerance_sq: DEFAULT_MATCH_TOLERANCE_SQ,
            parallel_warp: true,
            keep_intermediates: false,
            blend: BlendConfig::default(),
        }
    }
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 0.01,
            relaxation: 1.9,
        }
    }
}

impl SwapConfig {
    /// Loads the configuration from an optional JSON file, overridden by
    /// `FACESWAP_*` environment variables. Missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<SwapConfig> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            let config_str = fs::read_to_string(path)?;
            builder = builder.add_source(config::File::from_str(&config_str, config::FileFormat::Json));
        }
        let cfg = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<SwapConfig>()?;
        tracing::debug!(?cfg, "configuration loaded");
        Ok(cfg)
    }

    pub fn from_json_str(config_str: &str) -> Result<SwapConfig> {
        Ok(config::Config::builder()
            .add_source(config::File::from_str(config_str, config::FileFormat::Json))
            .build()?
            .try_deserialize::<SwapConfig>()?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg = SwapConfig::from_json_str(r#"{ "blend": { "max_iterations": 50 } }"#).unwrap();
        assert_eq!(cfg.blend.max_iterations, 50);
        assert_eq!(cfg.blend.relaxation, 1.9);
        assert_eq!(cfg.match_tolerance_sq, 16.0);
        assert!(cfg.parallel_warp);
        assert!(!cfg.keep_intermediates);
    }

    #[test]
    fn json_output_reads_back() {
        let cfg = SwapConfig {
            parallel_warp: false,
            ..SwapConfig::default()
        };
        let json = cfg.to_json_string().unwrap();
        assert_eq!(SwapConfig::from_json_str(&json).unwrap(), cfg);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SwapConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SwapConfig::load(Some(Path::new("/nonexistent/faceswap.json"))).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
