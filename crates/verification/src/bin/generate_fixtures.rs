//! Fixture generation binary
//!
//! Writes every standard verification case as a pair of PNG files
//! (`<name>_reference.png`, `<name>_candidate.png`) so the cases can be fed
//! to `validate` or inspected by hand.

use clap::Parser;
use spectral_validation_verification::fixtures::{save_image, standard_cases};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Generate reference/candidate image pairs for validation")]
struct Args {
    /// Output directory
    output_dir: PathBuf,

    /// Image width in pixels
    #[arg(long, default_value_t = 512)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 512)]
    height: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    std::fs::create_dir_all(&args.output_dir)?;

    for case in standard_cases(args.width, args.height)? {
        let reference_path = args.output_dir.join(format!("{}_reference.png", case.name));
        let candidate_path = args.output_dir.join(format!("{}_candidate.png", case.name));

        save_image(&case.reference, &reference_path)?;
        save_image(&case.candidate, &candidate_path)?;

        tracing::info!(
            scenario = case.scenario.name(),
            expect_pass = case.expect_pass,
            "Generated: {} / {}",
            reference_path.display(),
            candidate_path.display()
        );
    }

    Ok(())
}
