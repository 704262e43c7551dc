//! Pass/fail policy for the validation scenarios
//!
//! Evaluation is a pure function of the statistics and the configuration.

use crate::config::{Scenario, ValidationConfig};
use crate::reducer::ValidationResult;
use std::fmt;

/// Outcome of applying a scenario's gates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Verdict {
    pub passed: bool,
    /// Gates that failed, one message each
    pub failures: Vec<String>,
    /// Soft gates that were exceeded without failing the run
    pub warnings: Vec<String>,
}

impl Verdict {
    /// One-line summary suitable for test output
    pub fn diagnostic(&self) -> String {
        match (self.passed, self.warnings.is_empty()) {
            (true, true) => "passed".to_string(),
            (true, false) => format!("passed with warnings: {}", self.warnings.join("; ")),
            (false, _) => format!("failed: {}", self.failures.join("; ")),
        }
    }
}

fn percent(ratio: f32) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// Applies the gates of `scenario` to a result
///
/// # Arguments
/// * `scenario` - Which set of gates to apply
/// * `result` - Decoded statistics of a completed dispatch
/// * `config` - Thresholds and ratio limits
///
/// # Returns
/// The verdict; an accuracy failure is a failed verdict, never an error
pub fn evaluate(scenario: Scenario, result: &ValidationResult, config: &ValidationConfig) -> Verdict {
    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    match scenario {
        Scenario::ColorBarValidation => {
            // The extended layout gates on exact matches, the basic one on the acceptable band
            let (label, ratio) = match result.match_ratio() {
                Some(match_ratio) => ("match ratio", match_ratio),
                None => ("acceptable ratio", result.acceptable_ratio()),
            };
            if ratio <= config.pass_ratio {
                failures.push(format!(
                    "color bar {label} too low: {} (must exceed {}); the test environment may not be functioning correctly",
                    percent(ratio),
                    percent(config.pass_ratio)
                ));
            }

            let max_error_limit = config.error_threshold * config.max_error_factor;
            if result.max_error() >= max_error_limit {
                failures.push(format!("maximum error in color bars too high: {:.4} (must stay below {max_error_limit:.4})", result.max_error()));
            }
        }
        Scenario::SpectralMixValidation => {
            if result.warning_ratio() > config.warning_ratio_limit {
                warnings.push(format!(
                    "high number of pixels in warning range: {} (limit {})",
                    percent(result.warning_ratio()),
                    percent(config.warning_ratio_limit)
                ));
            }

            // Warning-band pixels count against the acceptable band as well
            if result.acceptable_ratio() <= 1.0 - config.acceptable_error_ratio {
                failures.push(format!(
                    "too many pixels beyond the error threshold: {} outside the acceptable band (limit {}), error ratio {}, maximum error {:.4}",
                    percent(result.unacceptable_ratio()),
                    percent(config.acceptable_error_ratio),
                    percent(result.error_ratio()),
                    result.max_error()
                ));
            }
        }
    }

    Verdict {
        passed: failures.is_empty(),
        failures,
        warnings,
    }
}

/// Complete output of one validation run
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub scenario: Scenario,
    /// Name of the backend that executed the dispatch
    pub backend: String,
    /// Reference image dimensions
    pub dimensions: (u32, u32),
    pub result: ValidationResult,
    pub verdict: Verdict,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.verdict.passed
    }

    /// Human-readable diagnostic line
    pub fn diagnostic(&self) -> String {
        format!("{}: {}", self.scenario, self.verdict.diagnostic())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = &self.result;
        let counters = result.counters();

        writeln!(f, "{} Results ({} backend):", self.scenario, self.backend)?;
        writeln!(f, "  Reference texture size: {}x{}", self.dimensions.0, self.dimensions.1)?;
        writeln!(f, "  Total pixels: {}", result.total_pixels())?;
        if let Some(match_ratio) = result.match_ratio() {
            writeln!(f, "  Match ratio: {}", percent(match_ratio))?;
        }
        writeln!(f, "  Acceptable ratio: {} ({} pixels)", percent(result.acceptable_ratio()), counters.acceptable_pixels)?;
        writeln!(f, "  Warning ratio: {} ({} pixels)", percent(result.warning_ratio()), counters.warning_pixels)?;
        writeln!(f, "  Error ratio: {} ({} pixels)", percent(result.error_ratio()), counters.error_pixels)?;
        if let (Some(count), Some(ratio)) = (counters.one_percent_error_pixels, result.one_percent_error_ratio()) {
            writeln!(f, "  1% error pixels: {count} ({})", percent(ratio))?;
        }
        writeln!(f, "  Max error: {:.4}", result.max_error())?;
        for warning in &self.verdict.warnings {
            writeln!(f, "  Warning: {warning}")?;
        }
        for failure in &self.verdict.failures {
            writeln!(f, "  Failure: {failure}")?;
        }
        write!(f, "  Verdict: {}", if self.verdict.passed { "PASS" } else { "FAIL" })
    }
}
