//! Scoped validation sessions
//!
//! A session owns a backend, and with it every device resource the backend
//! allocated. Resources are acquired when the session is opened and released
//! when it is dropped, whichever way the caller leaves.

use crate::config::{Scenario, ValidationConfig};
use crate::cpu_backend::CpuBackend;
use crate::dispatch::{ComputeBackend, DispatchController};
use crate::error::Result;
use crate::gpu_backend::GpuBackend;
use crate::image::Image;
use crate::policy::{ValidationReport, evaluate};
use crate::reducer::ValidationResult;

/// Runs complete validations (dispatch, reduction, policy) on one backend
#[derive(Debug)]
pub struct ValidationSession<B: ComputeBackend> {
    controller: DispatchController<B>,
    config: ValidationConfig,
    runs: usize,
}

impl ValidationSession<CpuBackend> {
    /// Opens a session on the host backend
    pub fn cpu(config: ValidationConfig) -> Result<Self> {
        Self::new(CpuBackend::new(), config)
    }
}

impl ValidationSession<GpuBackend> {
    /// Opens a session on the default GPU adapter
    pub fn gpu(config: ValidationConfig) -> Result<Self> {
        Self::new(GpuBackend::new_blocking()?, config)
    }
}

impl<B: ComputeBackend> ValidationSession<B> {
    /// Opens a session on `backend`
    ///
    /// # Returns
    /// The session, or an error if the configuration is inconsistent
    pub fn new(backend: B, config: ValidationConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(backend = backend.name(), scenario = config.scenario.name(), "validation session opened");
        Ok(Self {
            controller: DispatchController::new(backend),
            config,
            runs: 0,
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        self.controller.backend()
    }

    /// Number of completed runs
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Validates `candidate` against `reference` with the session's scenario
    pub fn run(&mut self, reference: &Image, candidate: &Image) -> Result<ValidationReport> {
        let config = self.config.clone();
        self.run_with(reference, candidate, &config)
    }

    /// Validates with a different scenario, keeping every other setting
    ///
    /// An explicit tile size override is kept; otherwise the tile follows `scenario`.
    pub fn run_scenario(&mut self, scenario: Scenario, reference: &Image, candidate: &Image) -> Result<ValidationReport> {
        let config = ValidationConfig { scenario, ..self.config.clone() };
        self.run_with(reference, candidate, &config)
    }

    fn run_with(&mut self, reference: &Image, candidate: &Image, config: &ValidationConfig) -> Result<ValidationReport> {
        let counters = self.controller.dispatch(reference, candidate, config)?;
        let result = ValidationResult::from_counters(counters);
        let verdict = evaluate(config.scenario, &result, config);
        self.runs += 1;

        let report = ValidationReport {
            scenario: config.scenario,
            backend: self.controller.backend().name().to_string(),
            dimensions: reference.dimensions(),
            result,
            verdict,
        };
        log_report(&report);

        Ok(report)
    }

    /// Closes the session and returns the backend for reuse
    pub fn into_backend(self) -> B {
        tracing::debug!(runs = self.runs, "validation session closed");
        self.controller.into_backend()
    }
}

fn log_report(report: &ValidationReport) {
    let result = &report.result;
    tracing::info!(
        scenario = report.scenario.name(),
        backend = %report.backend,
        total_pixels = result.total_pixels(),
        match_ratio = ?result.match_ratio(),
        acceptable_ratio = result.acceptable_ratio(),
        warning_ratio = result.warning_ratio(),
        error_ratio = result.error_ratio(),
        one_percent_error_pixels = ?result.counters().one_percent_error_pixels,
        max_error = format_args!("{:.4}", result.max_error()),
        "validation finished"
    );

    for warning in &report.verdict.warnings {
        tracing::warn!(scenario = report.scenario.name(), "{warning}");
    }
    if !report.verdict.passed {
        tracing::error!(
            scenario = report.scenario.name(),
            error_ratio = result.error_ratio(),
            max_error = format_args!("{:.4}", result.max_error()),
            "{}",
            report.verdict.diagnostic()
        );
    }
}

/// Validates two images on the host backend in a single call
pub fn validate_images(reference: &Image, candidate: &Image, config: &ValidationConfig) -> Result<ValidationReport> {
    ValidationSession::cpu(config.clone())?.run(reference, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_session_runs_both_scenarios() {
        let reference = Image::solid(10, 10, [0.3, 0.6, 0.9, 1.0]).unwrap();
        let mut session = ValidationSession::cpu(ValidationConfig::default()).unwrap();

        let color_bar = session.run(&reference, &reference).unwrap();
        assert_eq!(color_bar.scenario, Scenario::ColorBarValidation);
        assert!(color_bar.passed());

        let spectral = session.run_scenario(Scenario::SpectralMixValidation, &reference, &reference).unwrap();
        assert_eq!(spectral.scenario, Scenario::SpectralMixValidation);
        assert!(spectral.passed());
        assert_eq!(session.runs(), 2);
    }

    #[test]
    fn test_failed_run_does_not_poison_the_session() {
        let reference = Image::solid(4, 4, [0.0, 0.0, 0.0, 1.0]).unwrap();
        let wrong_size = Image::solid(5, 4, [0.0, 0.0, 0.0, 1.0]).unwrap();
        let mut session = ValidationSession::cpu(ValidationConfig::default()).unwrap();

        assert!(matches!(session.run(&reference, &wrong_size), Err(ValidationError::DimensionMismatch { .. })));
        assert_eq!(session.runs(), 0);

        let report = session.run(&reference, &reference).unwrap();
        assert_eq!(report.result.total_pixels(), 16);
        assert!(report.passed());
    }

    #[test]
    fn test_invalid_config_is_rejected_on_open() {
        let config = ValidationConfig {
            error_threshold: 0.5,
            ..ValidationConfig::default()
        };
        assert!(matches!(ValidationSession::cpu(config), Err(ValidationError::InvalidThresholds(_))));
    }

    #[test]
    fn test_validate_images_one_shot() {
        let reference = Image::solid(3, 3, [1.0, 1.0, 1.0, 1.0]).unwrap();
        let candidate = Image::solid(3, 3, [0.0, 0.0, 0.0, 1.0]).unwrap();
        let report = validate_images(&reference, &candidate, &ValidationConfig::for_scenario(Scenario::SpectralMixValidation)).unwrap();
        assert!(!report.passed());
        assert_eq!(report.result.error_ratio(), 1.0);
        assert_eq!(report.result.max_error(), 1.0);
    }
}
