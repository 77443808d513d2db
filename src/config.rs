//! Configuration file parser for the simulator
//!
//! Every key is optional; missing keys fall back to the defaults below, which
//! are the interactively tuned values the drag handlers were built against.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::enums::Interpolation;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub interaction: InteractionConfig,
    pub acquisition: AcquisitionConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScannerConfig {
    /// Full size (x, y, z) of the box, centred on the isocentre, that every
    /// scan volume must stay inside.
    pub dimensions_mm: [f64; 3],

    /// Smallest extent a scan volume may be scaled down to.
    pub min_extent_mm: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            dimensions_mm: [500.0, 500.0, 500.0],
            min_extent_mm: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct InteractionConfig {
    /// Scale ratios below this are treated as drag noise.
    pub scale_factor_min: f64,

    /// Scale ratios above this are treated as drag noise.
    pub scale_factor_max: f64,

    /// Handles closer than this (in pixels) to the overlay centre's x or y
    /// axis do not scale along that axis.
    pub scale_dead_zone_px: f64,

    /// Rotation increments smaller than this (in degrees) are dropped.
    pub rotation_epsilon_deg: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            scale_factor_min: 0.92,
            scale_factor_max: 1.08,
            scale_dead_zone_px: 5.5,
            rotation_epsilon_deg: 1e-6,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AcquisitionConfig {
    pub interpolation: Interpolation,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("Reading configuration: {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
