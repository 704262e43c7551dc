//! Synthetic reference images and controlled distortions
//!
//! Used to exercise both backends with inputs whose expected verdict is known.

use spectral_validation::{Image, Scenario, ValidationError};
use std::path::Path;

/// Full-intensity color bars: white, yellow, cyan, green, magenta, red, blue, black
const COLOR_BARS: [[f32; 3]; 8] = [
    [1.0, 1.0, 1.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 1.0],
    [0.0, 1.0, 0.0],
    [1.0, 0.0, 1.0],
    [1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, 0.0],
];

/// Creates a vertical color bar pattern
pub fn color_bars(width: u32, height: u32) -> Result<Image, ValidationError> {
    Image::from_fn(width, height, |x, _| {
        let [r, g, b] = COLOR_BARS[(x as u64 * COLOR_BARS.len() as u64 / width as u64) as usize];
        [r, g, b, 1.0]
    })
}

/// Creates a horizontal blend between two colors, darkened towards the bottom
pub fn mix_gradient(width: u32, height: u32, left: [f32; 3], right: [f32; 3]) -> Result<Image, ValidationError> {
    Image::from_fn(width, height, |x, y| {
        let t = if width > 1 { x as f32 / (width - 1) as f32 } else { 0.0 };
        let shade = 1.0 - 0.5 * y as f32 / height as f32;
        let mix = |c: usize| (left[c] + (right[c] - left[c]) * t) * shade;
        [mix(0), mix(1), mix(2), 1.0]
    })
}

/// Deterministic per-pixel hash in `[0, 1)`
fn pixel_hash(index: u64, seed: u64) -> f32 {
    let mut h = index.wrapping_add(seed.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    (h % 1_000_000) as f32 / 1_000_000.0
}

/// Shifts the green channel of roughly `fraction` of the pixels by `delta`
///
/// The shift is applied away from the nearest bound so the distance is exactly `delta`
/// for inputs in `[0, 1]`.
pub fn perturb(image: &Image, fraction: f32, delta: f32, seed: u64) -> Result<Image, ValidationError> {
    let width = image.width();
    Image::from_fn(width, image.height(), |x, y| {
        let mut p = image.pixel(x, y).unwrap_or([0.0; 4]);
        if pixel_hash(y as u64 * width as u64 + x as u64, seed) < fraction {
            p[1] = if p[1] + delta <= 1.0 { p[1] + delta } else { p[1] - delta };
        }
        p
    })
}

/// Writes an image as 8-bit RGBA
pub fn save_image(image: &Image, path: impl AsRef<Path>) -> Result<(), ValidationError> {
    let buffer = image::Rgba32FImage::from_raw(image.width(), image.height(), image.as_rgba().to_vec())
        .ok_or_else(|| ValidationError::InvalidImageData("sample buffer does not match image dimensions".to_string()))?;
    image::DynamicImage::ImageRgba32F(buffer).to_rgba8().save(path)?;
    Ok(())
}

/// A reference/candidate pair with a known expected verdict
pub struct FixtureCase {
    pub name: &'static str,
    pub scenario: Scenario,
    pub reference: Image,
    pub candidate: Image,
    pub expect_pass: bool,
}

/// The standard set of verification cases
pub fn standard_cases(width: u32, height: u32) -> Result<Vec<FixtureCase>, ValidationError> {
    let bars = color_bars(width, height)?;
    let mix = mix_gradient(width, height, [0.0, 0.13, 0.85], [0.99, 0.89, 0.0])?;

    Ok(vec![
        FixtureCase {
            name: "color_bars_identity",
            scenario: Scenario::ColorBarValidation,
            reference: bars.clone(),
            candidate: bars.clone(),
            expect_pass: true,
        },
        FixtureCase {
            name: "color_bars_quantization_noise",
            scenario: Scenario::ColorBarValidation,
            reference: bars.clone(),
            candidate: perturb(&bars, 0.005, 1.0 / 255.0, 1)?,
            expect_pass: true,
        },
        FixtureCase {
            name: "color_bars_corrupted",
            scenario: Scenario::ColorBarValidation,
            reference: bars.clone(),
            candidate: perturb(&bars, 0.1, 0.5, 2)?,
            expect_pass: false,
        },
        FixtureCase {
            name: "spectral_mix_identity",
            scenario: Scenario::SpectralMixValidation,
            reference: mix.clone(),
            candidate: mix.clone(),
            expect_pass: true,
        },
        FixtureCase {
            name: "spectral_mix_sparse_errors",
            scenario: Scenario::SpectralMixValidation,
            reference: mix.clone(),
            candidate: perturb(&mix, 0.002, 0.2, 3)?,
            expect_pass: true,
        },
        FixtureCase {
            name: "spectral_mix_dense_errors",
            scenario: Scenario::SpectralMixValidation,
            reference: mix.clone(),
            candidate: perturb(&mix, 0.05, 0.2, 4)?,
            expect_pass: false,
        },
        FixtureCase {
            name: "spectral_mix_sparse_warnings",
            scenario: Scenario::SpectralMixValidation,
            reference: mix.clone(),
            candidate: perturb(&mix, 0.004, 0.035, 6)?,
            expect_pass: true,
        },
        FixtureCase {
            name: "spectral_mix_dense_warnings",
            scenario: Scenario::SpectralMixValidation,
            reference: mix.clone(),
            candidate: perturb(&mix, 0.2, 0.035, 5)?,
            expect_pass: false,
        },
    ])
}
