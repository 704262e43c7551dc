//! GPU-accelerated image validation
//!
//! This crate compares a rendered image against a reference image in parallel
//! and reduces the per-pixel error into match counts, error buckets and the
//! maximum error, then applies a pass/fail policy to the resulting ratios. The
//! comparison runs either as a wgpu compute kernel or on the host thread pool;
//! both produce identical counters for identical inputs.

pub mod accumulator;
pub mod comparator;
pub mod config;
mod cpu_backend;
pub mod dispatch;
pub mod error;
mod gpu_backend;
pub mod image;
pub mod policy;
pub mod reducer;
mod session;
mod wgpu_helpers;

pub use accumulator::{Accumulator, StatisticsCounters};
pub use config::{CounterLayout, Scenario, ThresholdConfig, TileSize, ValidationConfig};
pub use cpu_backend::CpuBackend;
pub use dispatch::{ComputeBackend, DispatchController};
pub use error::ValidationError;
pub use gpu_backend::GpuBackend;
pub use image::Image;
pub use policy::{ValidationReport, Verdict};
pub use reducer::ValidationResult;
pub use session::{ValidationSession, validate_images};
