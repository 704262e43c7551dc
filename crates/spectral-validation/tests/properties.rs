//! End-to-end properties of the validation engine on the host backend

use spectral_validation::accumulator::Accumulator;
use spectral_validation::comparator::{Comparator, SCALE, error_distance};
use spectral_validation::{CounterLayout, CpuBackend, DispatchController, Image, Scenario, TileSize, ValidationConfig, ValidationError, ValidationResult, ValidationSession};

/// Eight vertical bars: white, yellow, cyan, green, magenta, red, blue, black
fn color_bars(width: u32, height: u32) -> Image {
    const BARS: [[f32; 3]; 8] = [
        [1.0, 1.0, 1.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 1.0],
        [0.0, 1.0, 0.0],
        [1.0, 0.0, 1.0],
        [1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, 0.0],
    ];
    Image::from_fn(width, height, |x, _| {
        let [r, g, b] = BARS[(x * 8 / width) as usize];
        [r, g, b, 1.0]
    })
    .unwrap()
}

/// Smooth two-axis gradient
fn gradient(width: u32, height: u32) -> Image {
    Image::from_fn(width, height, |x, y| [x as f32 / width as f32, y as f32 / height as f32, 0.5, 1.0]).unwrap()
}

/// Offsets the red channel of every `stride`-th pixel by `delta`
fn perturb_every(image: &Image, stride: u32, delta: f32) -> Image {
    let width = image.width();
    Image::from_fn(width, image.height(), |x, y| {
        let mut p = image.pixel(x, y).unwrap();
        if (y * width + x) % stride == 0 {
            p[0] = if p[0] + delta <= 1.0 { p[0] + delta } else { p[0] - delta };
        }
        p
    })
    .unwrap()
}

fn dispatch(reference: &Image, candidate: &Image, config: &ValidationConfig) -> ValidationResult {
    let mut controller = DispatchController::new(CpuBackend::new());
    ValidationResult::from_counters(controller.dispatch(reference, candidate, config).unwrap())
}

#[test]
fn test_identical_images_are_fully_acceptable() {
    let reference = gradient(64, 48);
    for scenario in Scenario::ALL {
        let result = dispatch(&reference, &reference, &ValidationConfig::for_scenario(scenario));
        assert_eq!(result.total_pixels(), 64 * 48);
        assert_eq!(result.acceptable_ratio(), 1.0);
        assert_eq!(result.error_ratio(), 0.0);
        assert_eq!(result.warning_ratio(), 0.0);
        assert_eq!(result.max_error(), 0.0);
        assert_eq!(result.match_ratio(), Some(1.0));
    }
}

#[test]
fn test_single_differing_pixel() {
    let reference = gradient(32, 32);
    let original = reference.pixel(5, 7).unwrap();
    let changed = [original[0], (original[1] + 0.3).min(1.0), original[2], 1.0];
    let candidate = reference.with_pixel(5, 7, changed);
    let expected_error = error_distance(original, changed);
    assert!(expected_error > 0.05);

    let result = dispatch(&reference, &candidate, &ValidationConfig::for_scenario(Scenario::SpectralMixValidation));
    let counters = result.counters();
    assert_eq!(counters.error_pixels, 1);
    assert_eq!(counters.acceptable_pixels, counters.total_pixels - 1);
    assert_eq!(counters.warning_pixels, 0);
    assert!((result.max_error() - expected_error).abs() <= 1.0 / SCALE);
}

#[test]
fn test_buckets_partition_every_pixel() {
    let reference = gradient(50, 30);
    let candidate = Image::from_fn(50, 30, |x, y| {
        let mut p = reference.pixel(x, y).unwrap();
        // Spread errors over all three bands
        p[2] += ((x + y) % 10) as f32 * 0.01;
        p
    })
    .unwrap();

    for layout in [CounterLayout::Basic, CounterLayout::Extended] {
        let config = ValidationConfig {
            layout,
            ..ValidationConfig::for_scenario(Scenario::SpectralMixValidation)
        };
        let result = dispatch(&reference, &candidate, &config);
        let counters = result.counters();

        assert_eq!(counters.acceptable_pixels + counters.warning_pixels + counters.error_pixels, counters.total_pixels);
        assert!(counters.acceptable_pixels > 0 && counters.warning_pixels > 0 && counters.error_pixels > 0);
        let sum = result.acceptable_ratio() + result.warning_ratio() + result.error_ratio();
        assert!((sum - 1.0).abs() < 1e-6, "ratios sum to {sum}");
    }
}

#[test]
fn test_reduction_is_idempotent() {
    let reference = gradient(40, 40);
    let candidate = perturb_every(&reference, 7, 0.03);
    let result = dispatch(&reference, &candidate, &ValidationConfig::default());

    let again = ValidationResult::from_counters(*result.counters());
    assert_eq!(result.acceptable_ratio().to_bits(), again.acceptable_ratio().to_bits());
    assert_eq!(result.warning_ratio().to_bits(), again.warning_ratio().to_bits());
    assert_eq!(result.error_ratio().to_bits(), again.error_ratio().to_bits());
    assert_eq!(result.match_ratio().map(f32::to_bits), again.match_ratio().map(f32::to_bits));
    assert_eq!(result.max_error().to_bits(), again.max_error().to_bits());
}

#[test]
fn test_color_bars_against_themselves_pass() {
    let reference = color_bars(128, 72);
    let config = ValidationConfig::for_scenario(Scenario::ColorBarValidation);
    let report = ValidationSession::cpu(config.clone()).unwrap().run(&reference, &reference).unwrap();

    assert!(report.passed(), "{report}");
    assert!(report.result.acceptable_ratio() > 0.98);
    assert!(report.result.max_error() < config.error_threshold * 2.0);
}

#[test]
fn test_color_bars_with_basic_layout_pass() {
    let reference = color_bars(64, 16);
    let config = ValidationConfig {
        layout: CounterLayout::Basic,
        ..ValidationConfig::for_scenario(Scenario::ColorBarValidation)
    };
    let report = ValidationSession::cpu(config).unwrap().run(&reference, &reference).unwrap();

    assert!(report.passed());
    assert_eq!(report.result.match_ratio(), None);
    assert_eq!(report.result.one_percent_error_ratio(), None);
}

#[test]
fn test_color_bars_with_broken_bar_fail() {
    let reference = color_bars(80, 10);
    // Replace the whole red bar with magenta
    let candidate = Image::from_fn(80, 10, |x, y| {
        let p = reference.pixel(x, y).unwrap();
        if (50..60).contains(&x) { [1.0, 0.0, 1.0, 1.0] } else { p }
    })
    .unwrap();

    let report = ValidationSession::cpu(ValidationConfig::for_scenario(Scenario::ColorBarValidation))
        .unwrap()
        .run(&reference, &candidate)
        .unwrap();
    assert!(!report.passed());
    assert_eq!(report.result.max_error(), 1.0);
    assert_eq!(report.verdict.failures.len(), 2);
}

#[test]
fn test_spectral_mix_error_ratio_gate() {
    let reference = gradient(100, 100);
    let config = ValidationConfig::for_scenario(Scenario::SpectralMixValidation);
    let mut session = ValidationSession::cpu(config).unwrap();

    // 2% of pixels well beyond the thresholds
    let two_percent = perturb_every(&reference, 50, 0.2);
    let report = session.run(&reference, &two_percent).unwrap();
    assert_eq!(report.result.counters().error_pixels, 200);
    assert!(!report.passed());
    assert!(report.verdict.failures[0].contains("error ratio 2.00%"));

    // 0.5% of pixels beyond the thresholds
    let half_percent = perturb_every(&reference, 200, 0.2);
    let report = session.run(&reference, &half_percent).unwrap();
    assert_eq!(report.result.counters().error_pixels, 50);
    assert!(report.passed());
}

#[test]
fn test_spectral_mix_fails_on_warning_band_pixels() {
    let reference = gradient(100, 100);
    let config = ValidationConfig::for_scenario(Scenario::SpectralMixValidation);
    let mut session = ValidationSession::cpu(config).unwrap();

    // 2% of pixels above the error threshold but inside the warning band
    let two_percent = perturb_every(&reference, 50, 0.03);
    let report = session.run(&reference, &two_percent).unwrap();
    assert_eq!(report.result.counters().warning_pixels, 200);
    assert_eq!(report.result.counters().error_pixels, 0);
    assert_eq!(report.result.acceptable_ratio(), 0.98);
    assert!(!report.passed(), "{report}");
    assert!(report.verdict.failures[0].contains("2.00% outside the acceptable band"));

    // 0.5% of pixels in the warning band
    let half_percent = perturb_every(&reference, 200, 0.03);
    let report = session.run(&reference, &half_percent).unwrap();
    assert_eq!(report.result.counters().warning_pixels, 50);
    assert!(report.passed(), "{report}");
}

#[test]
fn test_spectral_mix_warning_band_is_soft() {
    let reference = gradient(100, 100);
    // 10% of pixels in the warning band, tolerated by a looser acceptable band
    let candidate = perturb_every(&reference, 10, 0.035);
    let config = ValidationConfig {
        acceptable_error_ratio: 0.2,
        ..ValidationConfig::for_scenario(Scenario::SpectralMixValidation)
    };
    let report = ValidationSession::cpu(config)
        .unwrap()
        .run(&reference, &candidate)
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.result.counters().warning_pixels, 1000);
    assert_eq!(report.verdict.warnings.len(), 1);
}

#[test]
fn test_visitation_order_does_not_change_counters() {
    let reference = gradient(23, 17);
    let candidate = perturb_every(&reference, 3, 0.04);
    let config = ValidationConfig::default();
    let comparator = Comparator::new(config.thresholds(), config.layout);

    let mut coordinates: Vec<(u32, u32)> = (0..17).flat_map(|y| (0..23).map(move |x| (x, y))).collect();
    let mut accumulator = Accumulator::new();

    let in_order = {
        let cleared = accumulator.clear();
        for &(x, y) in &coordinates {
            comparator.visit(&reference, &candidate, x, y, &cleared);
        }
        cleared.snapshot(config.layout)
    };

    // Deterministic Fisher-Yates shuffle driven by an xorshift generator
    let mut state = 0x2545_f491_u32;
    for i in (1..coordinates.len()).rev() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        coordinates.swap(i, state as usize % (i + 1));
    }

    let shuffled = {
        let cleared = accumulator.clear();
        for &(x, y) in &coordinates {
            comparator.visit(&reference, &candidate, x, y, &cleared);
        }
        cleared.snapshot(config.layout)
    };

    let parallel = DispatchController::new(CpuBackend::new()).dispatch(&reference, &candidate, &config).unwrap();

    assert_eq!(in_order, shuffled);
    assert_eq!(in_order, parallel);
}

#[test]
fn test_tiling_overshoot_is_ignored() {
    // Neither dimension is a multiple of either tile size
    let reference = gradient(37, 29);
    let candidate = perturb_every(&reference, 4, 0.1);

    let mut results = Vec::new();
    for tile in [TileSize::square(8), TileSize::square(4), TileSize::new(16, 1)] {
        let config = ValidationConfig {
            tile_size: Some(tile),
            ..ValidationConfig::default()
        };
        let result = dispatch(&reference, &candidate, &config);
        assert_eq!(result.total_pixels(), 37 * 29);
        results.push(*result.counters());
    }
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_accumulator_is_cleared_between_runs() {
    let reference = gradient(20, 20);
    let broken = Image::solid(20, 20, [0.0, 0.0, 0.0, 1.0]).unwrap();
    let mut controller = DispatchController::new(CpuBackend::new());
    let config = ValidationConfig::for_scenario(Scenario::SpectralMixValidation);

    let first = controller.dispatch(&reference, &broken, &config).unwrap();
    assert!(first.error_pixels > 0);

    let second = controller.dispatch(&reference, &reference, &config).unwrap();
    assert_eq!(second.total_pixels, 400);
    assert_eq!(second.error_pixels, 0);
    assert_eq!(second.max_error_scaled, 0);
}

#[test]
fn test_rgb_candidate_against_rgba_reference() {
    let reference = color_bars(16, 4);
    let rgb_samples: Vec<f32> = reference.as_rgba().chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect();
    let candidate = Image::from_samples(16, 4, spectral_validation::image::Channels::Rgb, &rgb_samples).unwrap();

    let result = dispatch(&reference, &candidate, &ValidationConfig::default());
    assert_eq!(result.match_ratio(), Some(1.0));
}

#[test]
fn test_preconditions_are_distinct_errors() {
    let reference = gradient(8, 8);
    let mut controller = DispatchController::new(CpuBackend::new());

    let mismatch = controller.dispatch(&reference, &gradient(8, 9), &ValidationConfig::default()).unwrap_err();
    assert!(matches!(mismatch, ValidationError::DimensionMismatch { .. }));

    let bad_tile = ValidationConfig {
        tile_size: Some(TileSize::new(0, 4)),
        ..ValidationConfig::default()
    };
    assert!(matches!(controller.dispatch(&reference, &reference, &bad_tile), Err(ValidationError::InvalidTileSize { .. })));

    assert!(matches!(Image::solid(0, 8, [0.0; 4]), Err(ValidationError::EmptyImage { .. })));
}

#[test]
fn test_shipped_configs_load() {
    let configs = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs");

    let spectral = ValidationConfig::from_file(format!("{configs}/spectral_mix.yaml")).unwrap();
    assert_eq!(spectral.scenario, Scenario::SpectralMixValidation);
    assert_eq!(spectral.layout, CounterLayout::Basic);
    assert_eq!(spectral.effective_tile_size(), TileSize::square(4));

    let color_bar = ValidationConfig::from_file(format!("{configs}/color_bar.yaml")).unwrap();
    assert_eq!(color_bar.scenario, Scenario::ColorBarValidation);
    assert_eq!(color_bar.effective_tile_size(), TileSize::square(8));
}
