//! Image validation CLI
//!
//! Compares a rendered image against a reference image and applies the pass/fail
//! policy of a validation scenario. Exits with status 1 when the verdict fails.
//!
//! # Usage
//! ```bash
//! validate reference.png rendered.png --scenario spectral-mix --backend gpu
//! ```

use clap::{Parser, ValueEnum};
use spectral_validation::{CounterLayout, Image, Scenario, TileSize, ValidationConfig, ValidationReport, ValidationSession};
use std::path::PathBuf;

/// Which backend executes the comparison kernel
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Cpu,
    Gpu,
}

/// Counter layout of the comparison kernel
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    /// Five counters: total, bands and maximum error
    Basic,
    /// Seven counters, adding exact matches and the 1% band
    Extended,
}

impl From<Layout> for CounterLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Basic => CounterLayout::Basic,
            Layout::Extended => CounterLayout::Extended,
        }
    }
}

/// Command-line arguments for the validator
///
/// Flags override values loaded from `--config`.
#[derive(Parser)]
#[command(version, about = "Validate a rendered image against a reference image")]
struct Args {
    /// Reference image file path
    reference: PathBuf,

    /// Rendered image file path
    candidate: PathBuf,

    /// YAML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Validation scenario (color-bar, spectral-mix)
    #[arg(long, short)]
    scenario: Option<String>,

    /// Distance above which a pixel is no longer acceptable
    #[arg(long)]
    error_threshold: Option<f32>,

    /// Distance above which a pixel counts as an error
    #[arg(long)]
    warning_threshold: Option<f32>,

    /// Share of pixels outside the acceptable band tolerated by the spectral mix scenario
    #[arg(long)]
    acceptable_error_ratio: Option<f32>,

    /// Share of warning-band pixels above which the spectral mix scenario warns
    #[arg(long)]
    warning_ratio_limit: Option<f32>,

    /// Share of matching pixels the color bar scenario must exceed
    #[arg(long)]
    pass_ratio: Option<f32>,

    /// Color bar maximum error limit as a multiple of the error threshold
    #[arg(long)]
    max_error_factor: Option<f32>,

    /// Counter layout
    #[arg(long, value_enum)]
    layout: Option<Layout>,

    /// Work-group tile as WIDTHxHEIGHT (e.g. 8x8)
    #[arg(long, value_parser = parse_tile)]
    tile: Option<TileSize>,

    /// Execution backend
    #[arg(long, short, value_enum, default_value = "gpu")]
    backend: Backend,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn parse_tile(s: &str) -> Result<TileSize, String> {
    let (width, height) = s.split_once(['x', 'X']).ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let tile = TileSize::new(width.trim().parse().map_err(|e| format!("invalid tile width: {e}"))?, height.trim().parse().map_err(|e| format!("invalid tile height: {e}"))?);
    tile.validate().map_err(|e| e.to_string())?;
    Ok(tile)
}

/// Builds the effective configuration from the optional file and the flags
fn build_config(args: &Args) -> Result<ValidationConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ValidationConfig::from_file(path)?,
        None => ValidationConfig::default(),
    };

    if let Some(scenario) = &args.scenario {
        config.scenario = scenario.parse::<Scenario>()?;
    }
    if let Some(error_threshold) = args.error_threshold {
        config.error_threshold = error_threshold;
    }
    if let Some(warning_threshold) = args.warning_threshold {
        config.warning_threshold = warning_threshold;
    }
    if let Some(acceptable_error_ratio) = args.acceptable_error_ratio {
        config.acceptable_error_ratio = acceptable_error_ratio;
    }
    if let Some(warning_ratio_limit) = args.warning_ratio_limit {
        config.warning_ratio_limit = warning_ratio_limit;
    }
    if let Some(pass_ratio) = args.pass_ratio {
        config.pass_ratio = pass_ratio;
    }
    if let Some(max_error_factor) = args.max_error_factor {
        config.max_error_factor = max_error_factor;
    }
    if let Some(layout) = args.layout {
        config.layout = layout.into();
    }
    if args.tile.is_some() {
        config.tile_size = args.tile;
    }

    config.validate()?;
    Ok(config)
}

fn run(args: &Args, config: ValidationConfig, reference: &Image, candidate: &Image) -> Result<ValidationReport, Box<dyn std::error::Error>> {
    let report = match args.backend {
        Backend::Cpu => ValidationSession::cpu(config)?.run(reference, candidate)?,
        Backend::Gpu => ValidationSession::gpu(config)?.run(reference, candidate)?,
    };
    Ok(report)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = build_config(&args)?;

    // Load both images
    tracing::info!("Loading reference image from: {}", args.reference.display());
    let reference = Image::open(&args.reference)?;
    tracing::info!("Loading rendered image from: {}", args.candidate.display());
    let candidate = Image::open(&args.candidate)?;

    let report = run(&args, config, &reference, &candidate)?;
    println!("{report}");

    if !report.passed() {
        std::process::exit(1);
    }

    Ok(())
}
