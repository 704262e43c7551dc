//! Verification utilities for spectral-validation
//!
//! This crate provides synthetic fixtures with known verdicts and tools for
//! checking that the GPU backend reproduces the host backend's counters.

pub mod compare;
pub mod fixtures;
