//! Dispatch controller
//!
//! Checks the preconditions of a run, computes the work-group grid that
//! covers the reference image and hands the job to a [`ComputeBackend`].
//! Backends own their accumulator and must zero it before every dispatch;
//! `execute` takes `&mut self`, so one backend never runs two dispatches at once.

use crate::accumulator::StatisticsCounters;
use crate::config::{CounterLayout, ThresholdConfig, TileSize, ValidationConfig};
use crate::error::{Result, ValidationError};
use crate::image::Image;

/// Work-group grid covering an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    pub tile: TileSize,
    /// Number of work-groups along X
    pub groups_x: u32,
    /// Number of work-groups along Y
    pub groups_y: u32,
}

impl DispatchGrid {
    /// Computes the smallest grid of whole tiles covering `width x height`
    pub fn cover(width: u32, height: u32, tile: TileSize) -> Self {
        Self {
            tile,
            groups_x: width.div_ceil(tile.width),
            groups_y: height.div_ceil(tile.height),
        }
    }

    /// Total number of work-groups
    pub fn workgroup_count(&self) -> u64 {
        self.groups_x as u64 * self.groups_y as u64
    }

    /// Total number of invocations, including those that overshoot the image
    pub fn invocation_count(&self) -> u64 {
        self.workgroup_count() * self.tile.width as u64 * self.tile.height as u64
    }
}

/// Everything a backend needs to execute one dispatch
#[derive(Debug, Clone, Copy)]
pub struct DispatchJob<'a> {
    pub reference: &'a Image,
    pub candidate: &'a Image,
    pub thresholds: ThresholdConfig,
    pub layout: CounterLayout,
    pub grid: DispatchGrid,
}

/// An execution target for the comparison kernel
pub trait ComputeBackend {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Clears the accumulator, runs the kernel over the grid and reads the counters back
    ///
    /// Must not return before the dispatch has completed.
    fn execute(&mut self, job: &DispatchJob<'_>) -> Result<StatisticsCounters>;
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&mut self, job: &DispatchJob<'_>) -> Result<StatisticsCounters> {
        (**self).execute(job)
    }
}

/// Validates inputs and drives a backend
#[derive(Debug)]
pub struct DispatchController<B> {
    backend: B,
}

impl<B: ComputeBackend> DispatchController<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Releases the backend
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Runs one full dispatch of the comparator
    ///
    /// # Arguments
    /// * `reference` - Ground-truth image
    /// * `candidate` - Image produced by the system under test
    /// * `config` - Thresholds, layout and tiling for this run
    ///
    /// # Returns
    /// The raw counters of the completed dispatch
    pub fn dispatch(&mut self, reference: &Image, candidate: &Image, config: &ValidationConfig) -> Result<StatisticsCounters> {
        config.validate()?;
        check_images(reference, candidate)?;

        let tile = config.effective_tile_size();
        let grid = DispatchGrid::cover(reference.width(), reference.height(), tile);
        tracing::debug!(
            backend = self.backend.name(),
            scenario = config.scenario.name(),
            width = reference.width(),
            height = reference.height(),
            tile = %tile,
            groups_x = grid.groups_x,
            groups_y = grid.groups_y,
            "dispatching comparison kernel"
        );

        let job = DispatchJob {
            reference,
            candidate,
            thresholds: config.thresholds(),
            layout: config.layout,
            grid,
        };
        let counters = self.backend.execute(&job)?;

        // Every in-bounds pixel is visited exactly once
        if counters.total_pixels as u64 != reference.pixel_count() {
            return Err(ValidationError::Device(format!(
                "{} reported {} pixels for a {}x{} image",
                self.backend.name(),
                counters.total_pixels,
                reference.width(),
                reference.height()
            )));
        }

        Ok(counters)
    }
}

/// Checks that two images can be compared
pub fn check_images(reference: &Image, candidate: &Image) -> Result<()> {
    if reference.dimensions() != candidate.dimensions() {
        return Err(ValidationError::DimensionMismatch {
            reference: reference.dimensions(),
            candidate: candidate.dimensions(),
        });
    }

    let (width, height) = reference.dimensions();
    if width == 0 || height == 0 {
        return Err(ValidationError::EmptyImage { width, height });
    }
    // Counters are 32-bit on the device
    if reference.pixel_count() > u32::MAX as u64 {
        return Err(ValidationError::InvalidImageData(format!("{width}x{height} exceeds the 32-bit pixel counter range")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scenario;

    /// Backend that reports a fixed pixel total and counts how often it ran
    struct FixedBackend {
        total: u32,
        runs: usize,
    }

    impl ComputeBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn execute(&mut self, job: &DispatchJob<'_>) -> Result<StatisticsCounters> {
            self.runs += 1;
            assert!(job.grid.invocation_count() >= job.reference.pixel_count());
            Ok(StatisticsCounters {
                total_pixels: self.total,
                acceptable_pixels: self.total,
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_grid_rounds_up_to_whole_tiles() {
        let grid = DispatchGrid::cover(17, 8, TileSize::square(8));
        assert_eq!((grid.groups_x, grid.groups_y), (3, 1));
        assert_eq!(grid.workgroup_count(), 3);
        assert_eq!(grid.invocation_count(), 192);

        let grid = DispatchGrid::cover(512, 512, TileSize::square(4));
        assert_eq!((grid.groups_x, grid.groups_y), (128, 128));

        let grid = DispatchGrid::cover(1, 1, TileSize::new(16, 16));
        assert_eq!(grid.workgroup_count(), 1);
    }

    #[test]
    fn test_dimension_mismatch_never_reaches_backend() {
        let reference = Image::solid(4, 4, [0.0; 4]).unwrap();
        let candidate = Image::solid(4, 5, [0.0; 4]).unwrap();
        let mut controller = DispatchController::new(FixedBackend { total: 16, runs: 0 });

        let err = controller.dispatch(&reference, &candidate, &ValidationConfig::default()).unwrap_err();
        assert!(matches!(err, ValidationError::DimensionMismatch { reference: (4, 4), candidate: (4, 5) }));
        assert!(err.is_precondition());
        assert_eq!(controller.backend().runs, 0);
    }

    #[test]
    fn test_invalid_config_never_reaches_backend() {
        let image = Image::solid(4, 4, [0.0; 4]).unwrap();
        let mut config = ValidationConfig::for_scenario(Scenario::SpectralMixValidation);
        config.warning_threshold = 0.001;
        let mut controller = DispatchController::new(FixedBackend { total: 16, runs: 0 });

        assert!(matches!(controller.dispatch(&image, &image, &config), Err(ValidationError::InvalidThresholds(_))));
        assert_eq!(controller.into_backend().runs, 0);
    }

    #[test]
    fn test_incomplete_dispatch_is_a_device_error() {
        let image = Image::solid(4, 4, [0.0; 4]).unwrap();
        let mut controller = DispatchController::new(FixedBackend { total: 15, runs: 0 });

        let err = controller.dispatch(&image, &image, &ValidationConfig::default()).unwrap_err();
        assert!(matches!(err, ValidationError::Device(_)));
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_boxed_backend_dispatches() {
        let image = Image::solid(3, 3, [0.0; 4]).unwrap();
        let backend: Box<dyn ComputeBackend> = Box::new(FixedBackend { total: 9, runs: 0 });
        let mut controller = DispatchController::new(backend);

        let counters = controller.dispatch(&image, &image, &ValidationConfig::default()).unwrap();
        assert_eq!(counters.total_pixels, 9);
        assert_eq!(controller.backend().name(), "fixed");
    }
}
