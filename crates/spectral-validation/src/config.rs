//! Validation configuration
//!
//! Thresholds, policy gates, scenario selection and dispatch tiling. The
//! configuration can be built in code or loaded from a YAML document, where
//! every field is optional and falls back to the defaults below.

use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Default normalized distance above which a pixel leaves the acceptable band
pub const DEFAULT_ERROR_THRESHOLD: f32 = 0.02;
/// Default normalized distance above which a pixel is counted as an error
pub const DEFAULT_WARNING_THRESHOLD: f32 = 0.05;
/// Default share of error pixels tolerated by the spectral mix scenario
pub const DEFAULT_ACCEPTABLE_ERROR_RATIO: f32 = 0.01;
/// Default warning share above which a passing run is flagged as degraded
pub const DEFAULT_WARNING_RATIO_LIMIT: f32 = 0.05;
/// Default ratio the color bar scenario must strictly exceed
pub const DEFAULT_PASS_RATIO: f32 = 0.98;
/// Default multiple of the error threshold the color bar max error must stay below
pub const DEFAULT_MAX_ERROR_FACTOR: f32 = 2.0;

/// Largest number of invocations a single work-group may contain
pub const MAX_INVOCATIONS_PER_TILE: u32 = 256;

/// The named validation scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Near-perfect reproduction of a color bar pattern
    ColorBarValidation,
    /// High but not perfect accuracy of a spectral mixing render
    SpectralMixValidation,
}

impl Scenario {
    /// All scenarios in a stable order
    pub const ALL: [Scenario; 2] = [Scenario::ColorBarValidation, Scenario::SpectralMixValidation];

    /// Returns the scenario name as used in configuration files and reports
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::ColorBarValidation => "ColorBarValidation",
            Scenario::SpectralMixValidation => "SpectralMixValidation",
        }
    }

    /// Work-group tile used when the configuration does not override it
    pub fn default_tile_size(&self) -> TileSize {
        match self {
            Scenario::ColorBarValidation => TileSize::square(8),
            Scenario::SpectralMixValidation => TileSize::square(4),
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        // Accept the canonical names plus short lowercase aliases for the CLI
        match s.to_ascii_lowercase().as_str() {
            "colorbarvalidation" | "colorbar" | "color-bar" => Ok(Scenario::ColorBarValidation),
            "spectralmixvalidation" | "spectralmix" | "spectral-mix" => Ok(Scenario::SpectralMixValidation),
            _ => Err(ValidationError::UnknownScenario(s.to_string())),
        }
    }
}

/// Which statistics counters a comparator kernel maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterLayout {
    /// Five counters: total, acceptable, warning, error, max error
    Basic,
    /// Seven counters: the basic set plus exact matches and the 1% band
    #[default]
    Extended,
}

impl CounterLayout {
    /// Number of counters present in this layout
    pub fn counter_count(&self) -> usize {
        match self {
            CounterLayout::Basic => 5,
            CounterLayout::Extended => 7,
        }
    }

    /// Whether near-exact matches and the 1% band are tracked
    pub fn tracks_extended(&self) -> bool {
        matches!(self, CounterLayout::Extended)
    }
}

/// Size of the pixel block handled by one work-group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Checks that the tile can be dispatched
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ValidationError::InvalidTileSize {
                width: self.width,
                height: self.height,
                reason: "tile dimensions must be non-zero",
            });
        }
        if self.width.saturating_mul(self.height) > MAX_INVOCATIONS_PER_TILE {
            return Err(ValidationError::InvalidTileSize {
                width: self.width,
                height: self.height,
                reason: "tile exceeds 256 invocations per work-group",
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for TileSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The two-tier banding thresholds used by the comparator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    /// Distance above which a pixel is no longer acceptable
    pub error_threshold: f32,
    /// Distance above which a pixel is counted as an error
    pub warning_threshold: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    /// Checks that both thresholds are finite, non-negative and ordered
    pub fn validate(&self) -> Result<()> {
        if !self.error_threshold.is_finite() || !self.warning_threshold.is_finite() {
            return Err(ValidationError::InvalidThresholds("thresholds must be finite".to_string()));
        }
        if self.error_threshold < 0.0 || self.warning_threshold < 0.0 {
            return Err(ValidationError::InvalidThresholds("thresholds must be non-negative".to_string()));
        }
        if self.error_threshold > self.warning_threshold {
            return Err(ValidationError::InvalidThresholds(format!(
                "error_threshold ({}) must not exceed warning_threshold ({})",
                self.error_threshold, self.warning_threshold
            )));
        }
        Ok(())
    }
}

/// Complete configuration of one validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub scenario: Scenario,
    pub error_threshold: f32,
    pub warning_threshold: f32,
    /// Share of pixels outside the acceptable band the spectral mix scenario tolerates
    pub acceptable_error_ratio: f32,
    /// Warning share above which a passing run carries a warning
    pub warning_ratio_limit: f32,
    /// Ratio the color bar scenario must strictly exceed
    pub pass_ratio: f32,
    /// Color bar max error must stay below `error_threshold * max_error_factor`
    pub max_error_factor: f32,
    pub layout: CounterLayout,
    /// Overrides the scenario's default work-group tile
    pub tile_size: Option<TileSize>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::for_scenario(Scenario::ColorBarValidation)
    }
}

impl ValidationConfig {
    /// Default configuration for the given scenario
    pub fn for_scenario(scenario: Scenario) -> Self {
        Self {
            scenario,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            acceptable_error_ratio: DEFAULT_ACCEPTABLE_ERROR_RATIO,
            warning_ratio_limit: DEFAULT_WARNING_RATIO_LIMIT,
            pass_ratio: DEFAULT_PASS_RATIO,
            max_error_factor: DEFAULT_MAX_ERROR_FACTOR,
            layout: CounterLayout::default(),
            tile_size: None,
        }
    }

    /// Parses a YAML configuration document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_norway::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    /// Banding thresholds handed to the comparator
    pub fn thresholds(&self) -> ThresholdConfig {
        ThresholdConfig {
            error_threshold: self.error_threshold,
            warning_threshold: self.warning_threshold,
        }
    }

    /// Tile size in effect for this run
    pub fn effective_tile_size(&self) -> TileSize {
        self.tile_size.unwrap_or_else(|| self.scenario.default_tile_size())
    }

    /// Checks every field for consistency
    pub fn validate(&self) -> Result<()> {
        self.thresholds().validate()?;

        let ratios = [
            ("acceptable_error_ratio", self.acceptable_error_ratio),
            ("warning_ratio_limit", self.warning_ratio_limit),
            ("pass_ratio", self.pass_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::InvalidThresholds(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if !self.max_error_factor.is_finite() || self.max_error_factor <= 0.0 {
            return Err(ValidationError::InvalidThresholds(format!("max_error_factor must be positive, got {}", self.max_error_factor)));
        }

        self.effective_tile_size().validate()
    }
}
