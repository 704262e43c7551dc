//! Per-pixel comparison kernel
//!
//! The error distance between two colors is the largest absolute difference
//! across the red, green and blue channels. Alpha does not participate, so an
//! RGB image can be validated against an RGBA one. The distance is expressed
//! as a fraction of full scale, which is the unit every threshold uses.
//!
//! The same classification is implemented twice: [`compare_pixel`] on the host
//! and `compare.wgsl` on the device. Both must produce identical counters for
//! identical inputs, which is why rounding is spelled out as `floor(x + 0.5)`
//! instead of relying on either language's `round`.

use crate::accumulator::{ClearedAccumulator, CounterSlot};
use crate::config::{CounterLayout, ThresholdConfig, TileSize};
use crate::image::Image;

/// Fixed-point scale used to store the maximum error in an integer counter
pub const SCALE: f32 = 10000.0;

/// Distances below this are counted as exact matches (half an 8-bit step)
pub const MATCH_EPSILON: f32 = 0.5 / 255.0;

/// Distance above which a pixel falls into the stricter 1% band
pub const ONE_PERCENT_BAND: f32 = 0.01;

/// WGSL source of the comparison kernel, with tile-size placeholders
const COMPARE_KERNEL_TEMPLATE: &str = include_str!("shaders/compare.wgsl");

/// Mutually exclusive error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// `error <= error_threshold`
    Acceptable,
    /// `error_threshold < error <= warning_threshold`
    Warning,
    /// `error > warning_threshold`
    Error,
}

/// Classification of a single pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelOutcome {
    /// Error distance in `[0, 1]` for normalized inputs
    pub error: f32,
    pub band: Band,
    /// Below [`MATCH_EPSILON`]
    pub exact_match: bool,
    /// Above [`ONE_PERCENT_BAND`]
    pub beyond_one_percent: bool,
}

/// Computes the error distance between two RGBA samples
pub fn error_distance(reference: [f32; 4], candidate: [f32; 4]) -> f32 {
    let dr = (reference[0] - candidate[0]).abs();
    let dg = (reference[1] - candidate[1]).abs();
    let db = (reference[2] - candidate[2]).abs();
    dr.max(dg).max(db)
}

/// Encodes an error distance as a scaled integer for atomic max reduction
pub fn encode_error(error: f32) -> u32 {
    // Float to int casts saturate, so negative or huge values clamp to the u32 range
    (error * SCALE + 0.5).floor() as u32
}

/// Decodes a scaled integer back into an error distance
pub fn decode_error(scaled: u32) -> f32 {
    scaled as f32 / SCALE
}

/// Classifies one reference/candidate sample pair
pub fn compare_pixel(reference: [f32; 4], candidate: [f32; 4], thresholds: &ThresholdConfig) -> PixelOutcome {
    let error = error_distance(reference, candidate);

    let band = if error <= thresholds.error_threshold {
        Band::Acceptable
    } else if error <= thresholds.warning_threshold {
        Band::Warning
    } else {
        Band::Error
    };

    PixelOutcome {
        error,
        band,
        exact_match: error < MATCH_EPSILON,
        beyond_one_percent: error > ONE_PERCENT_BAND,
    }
}

/// Host implementation of the comparison kernel
///
/// One [`Comparator::visit`] call corresponds to one kernel invocation.
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    pub thresholds: ThresholdConfig,
    pub layout: CounterLayout,
}

impl Comparator {
    pub fn new(thresholds: ThresholdConfig, layout: CounterLayout) -> Self {
        Self { thresholds, layout }
    }

    /// Compares the pixel at `(x, y)` and records the outcome
    ///
    /// Coordinates outside the reference image are skipped without touching
    /// any counter, which lets the dispatch grid overshoot the image.
    ///
    /// # Returns
    /// The outcome, or `None` when the coordinate was out of bounds
    pub fn visit(&self, reference: &Image, candidate: &Image, x: u32, y: u32, accumulator: &ClearedAccumulator<'_>) -> Option<PixelOutcome> {
        let reference_sample = reference.pixel(x, y)?;
        let candidate_sample = candidate.pixel(x, y)?;
        let outcome = compare_pixel(reference_sample, candidate_sample, &self.thresholds);

        accumulator.add(CounterSlot::TotalPixels, 1);
        match outcome.band {
            Band::Acceptable => accumulator.add(CounterSlot::AcceptablePixels, 1),
            Band::Warning => accumulator.add(CounterSlot::WarningPixels, 1),
            Band::Error => accumulator.add(CounterSlot::ErrorPixels, 1),
        }
        if self.layout.tracks_extended() {
            if outcome.exact_match {
                accumulator.add(CounterSlot::MatchedPixels, 1);
            }
            if outcome.beyond_one_percent {
                accumulator.add(CounterSlot::OnePercentErrorPixels, 1);
            }
        }
        accumulator.max(CounterSlot::MaxErrorScaled, encode_error(outcome.error));

        Some(outcome)
    }
}

/// Returns the WGSL kernel specialized for a work-group tile
pub fn kernel_source(tile: TileSize) -> String {
    COMPARE_KERNEL_TEMPLATE
        .replace("{{TILE_WIDTH}}", &tile.width.to_string())
        .replace("{{TILE_HEIGHT}}", &tile.height.to_string())
}
