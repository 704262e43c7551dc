//! Backend parity verification binary
//!
//! This binary runs every standard fixture through the host and GPU backends,
//! checks that both produce identical counters and that each verdict matches
//! the fixture's expectation.

use spectral_validation::{CounterLayout, CpuBackend, DispatchController, GpuBackend, ValidationConfig, ValidationResult, policy::evaluate};
use spectral_validation_verification::{
    compare::{CompareResult, compare_counters},
    fixtures::standard_cases,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let args: Vec<String> = std::env::args().collect();
    let (width, height) = match args.len() {
        1 => (512, 512),
        3 => (args[1].parse()?, args[2].parse()?),
        _ => {
            eprintln!("Usage: {} [<width> <height>]", args[0]);
            return Ok(());
        }
    };

    let gpu = GpuBackend::new().await?;
    println!("Using adapter: {}", gpu.adapter_name());

    let mut gpu = DispatchController::new(gpu);
    let mut cpu = DispatchController::new(CpuBackend::new());
    let mut failures = 0;

    for case in standard_cases(width, height)? {
        for layout in [CounterLayout::Basic, CounterLayout::Extended] {
            let config = ValidationConfig {
                layout,
                ..ValidationConfig::for_scenario(case.scenario)
            };
            let label = format!("{} ({layout:?})", case.name);

            let cpu_counters = match cpu.dispatch(&case.reference, &case.candidate, &config) {
                Ok(counters) => counters,
                Err(e) => {
                    eprintln!("✗ Error running CPU backend for {label}: {e}");
                    failures += 1;
                    continue;
                }
            };
            let gpu_counters = match gpu.dispatch(&case.reference, &case.candidate, &config) {
                Ok(counters) => counters,
                Err(e) => {
                    eprintln!("✗ Error running GPU backend for {label}: {e}");
                    failures += 1;
                    continue;
                }
            };

            // Compare outputs
            match compare_counters(&cpu_counters, &gpu_counters) {
                CompareResult::Match => {}
                CompareResult::LayoutMismatch { reference_layout, tested_layout } => {
                    eprintln!("✗ Layout mismatch for {label}: CPU {reference_layout:?}, GPU {tested_layout:?}");
                    failures += 1;
                    continue;
                }
                CompareResult::CounterMismatch {
                    total_matched,
                    buckets_matched,
                    max_error_matched,
                    extended_matched,
                } => {
                    eprintln!("✗ Counter mismatch for {label}: total {total_matched}, buckets {buckets_matched}, max error {max_error_matched}, extended {extended_matched}");
                    eprintln!("    CPU: {cpu_counters:?}");
                    eprintln!("    GPU: {gpu_counters:?}");
                    failures += 1;
                    continue;
                }
            }

            let verdict = evaluate(case.scenario, &ValidationResult::from_counters(gpu_counters), &config);
            if verdict.passed == case.expect_pass {
                println!("✓ Backends agree for {label}: {}", verdict.diagnostic());
            } else {
                eprintln!("✗ Unexpected verdict for {label}: {}", verdict.diagnostic());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} verification case(s) failed").into());
    }

    Ok(())
}
