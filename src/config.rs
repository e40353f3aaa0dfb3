//! Kernel configuration.
//!
//! ## Sources
//!
//! A [`KernelConfig`] starts from its defaults or from a JSON document, then
//! environment overrides are applied:
//!
//! - `VESSEL_TEMPLATE`: `portal`, `inferior_cava` or `empty`
//! - `VESSEL_STRATEGY`: a [`StrategyKind`] name or label
//!
//! ## Parameter hashing
//!
//! Engine parameters are hashed the same way topology snapshots are: floats
//! are quantized (×1e6, rounded to i64) and the result is hashed with xxh64
//! over canonical JSON. Extraction reports carry that hash.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize};
use crate::pairing::StrategyKind;
use crate::template::VesselTemplate;
use crate::DEFAULT_ENGINE_PARAMS_VERSION;

/// Environment variable overriding the template.
pub const TEMPLATE_ENV: &str = "VESSEL_TEMPLATE";
/// Environment variable overriding the pairing strategy.
pub const STRATEGY_ENV: &str = "VESSEL_STRATEGY";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template name not recognized.
    #[error("Unknown vessel template: {0}")]
    UnknownTemplate(String),

    /// Strategy name not recognized.
    #[error("Unknown pairing strategy: {0}")]
    UnknownStrategy(String),

    /// A parameter is out of range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Parameter name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Level set segmentation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSetParameters {
    /// Inflation weight.
    pub inflation: i32,
    /// Curvature weight.
    pub curvature: i32,
    /// Attraction weight.
    pub attraction: i32,
    /// Number of level set iterations.
    pub iteration_number: u32,
    /// Initialization method passed to the engine.
    pub initialization_method: String,
    /// Level set method passed to the engine.
    pub level_set_method: String,
}

impl Default for LevelSetParameters {
    fn default() -> Self {
        Self {
            inflation: 0,
            curvature: 70,
            attraction: 50,
            iteration_number: 10,
            initialization_method: "collidingfronts".to_string(),
            level_set_method: "geodesic".to_string(),
        }
    }
}

/// Vesselness filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselnessParameters {
    /// Smallest vessel diameter (mm).
    pub minimum_diameter: f64,
    /// Largest vessel diameter (mm).
    pub maximum_diameter: f64,
    /// Plate suppression (percent).
    pub suppress_plates_percent: f64,
    /// Blob suppression (percent).
    pub suppress_blobs_percent: f64,
    /// Vessel contrast.
    pub vessel_contrast: f64,
    /// Growth applied to the region of interest around the seeds.
    pub roi_growth_factor: f64,
    /// Whether to restrict filtering to a region of interest.
    pub use_roi: bool,
    /// Minimal region of interest extent (voxels).
    pub min_roi_extent: u32,
}

impl Default for VesselnessParameters {
    fn default() -> Self {
        Self {
            minimum_diameter: 1.0,
            maximum_diameter: 7.0,
            suppress_plates_percent: 50.0,
            suppress_blobs_percent: 50.0,
            vessel_contrast: 5.0,
            roi_growth_factor: 1.2,
            use_roi: true,
            min_roi_extent: 20,
        }
    }
}

/// Parameters forwarded to the segmentation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParameters {
    /// Parameter set version.
    pub version: String,
    /// Level set parameters.
    pub level_set: LevelSetParameters,
    /// Vesselness filter parameters.
    pub vesselness: VesselnessParameters,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            version: DEFAULT_ENGINE_PARAMS_VERSION.to_string(),
            level_set: LevelSetParameters::default(),
            vesselness: VesselnessParameters::default(),
        }
    }
}

/// Quantized vesselness parameters for deterministic hashing.
#[derive(Serialize)]
struct QuantizedVesselness {
    minimum_diameter: i64,
    maximum_diameter: i64,
    suppress_plates_percent: i64,
    suppress_blobs_percent: i64,
    vessel_contrast: i64,
    roi_growth_factor: i64,
    use_roi: bool,
    min_roi_extent: u32,
}

/// Quantized engine parameters for deterministic hashing.
#[derive(Serialize)]
struct QuantizedEngineParams<'a> {
    version: &'a str,
    level_set: &'a LevelSetParameters,
    vesselness: QuantizedVesselness,
}

impl EngineParameters {
    /// Hash of the parameters, stable across float formatting.
    pub fn params_hash(&self) -> Result<String, ConfigError> {
        Ok(canonical_hash_hex(&self.to_quantized())?)
    }

    fn to_quantized(&self) -> QuantizedEngineParams<'_> {
        let v = &self.vesselness;
        QuantizedEngineParams {
            version: &self.version,
            level_set: &self.level_set,
            vesselness: QuantizedVesselness {
                minimum_diameter: quantize(v.minimum_diameter),
                maximum_diameter: quantize(v.maximum_diameter),
                suppress_plates_percent: quantize(v.suppress_plates_percent),
                suppress_blobs_percent: quantize(v.suppress_blobs_percent),
                vessel_contrast: quantize(v.vessel_contrast),
                roi_growth_factor: quantize(v.roi_growth_factor),
                use_roi: v.use_roi,
                min_roi_extent: v.min_roi_extent,
            },
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.vesselness;
        if v.minimum_diameter.is_nan() || v.minimum_diameter <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "vesselness.minimum_diameter",
                reason: format!("must be positive, got {}", v.minimum_diameter),
            });
        }
        if v.maximum_diameter < v.minimum_diameter {
            return Err(ConfigError::InvalidValue {
                field: "vesselness.maximum_diameter",
                reason: format!(
                    "{} is below minimum_diameter {}",
                    v.maximum_diameter, v.minimum_diameter
                ),
            });
        }
        for (field, value) in [
            ("vesselness.suppress_plates_percent", v.suppress_plates_percent),
            ("vesselness.suppress_blobs_percent", v.suppress_blobs_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be within 0..=100, got {value}"),
                });
            }
        }
        if v.roi_growth_factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "vesselness.roi_growth_factor",
                reason: format!("must be at least 1, got {}", v.roi_growth_factor),
            });
        }
        if self.level_set.iteration_number == 0 {
            return Err(ConfigError::InvalidValue {
                field: "level_set.iteration_number",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Template applied to new trees.
    pub template: VesselTemplate,
    /// Pairing strategy used for extraction.
    pub strategy: StrategyKind,
    /// Segmentation engine parameters.
    pub engine: EngineParameters,
}

impl KernelConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `VESSEL_TEMPLATE` / `VESSEL_STRATEGY` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(TEMPLATE_ENV) {
            self.template = VesselTemplate::from_str(value.trim())
                .ok_or_else(|| ConfigError::UnknownTemplate(value.clone()))?;
            tracing::debug!(template = %self.template, "template overridden from environment");
        }
        if let Some(value) = lookup(STRATEGY_ENV) {
            self.strategy = value
                .parse::<StrategyKind>()
                .map_err(|_| ConfigError::UnknownStrategy(value.clone()))?;
            tracing::debug!(strategy = %self.strategy, "strategy overridden from environment");
        }
        Ok(())
    }
}
