//! Counter comparison utilities for verification
//!
//! This module provides functions for comparing the statistics produced by
//! two backends to verify that the device kernel matches the host kernel.

use spectral_validation::{CounterLayout, StatisticsCounters};

/// Result of comparing two sets of counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    /// Counters match exactly
    Match,
    /// The two runs tracked different counter layouts
    LayoutMismatch {
        /// Layout of the reference backend's counters
        reference_layout: CounterLayout,
        /// Layout of the tested backend's counters
        tested_layout: CounterLayout,
    },
    /// Layouts agree but some counters differ
    CounterMismatch {
        /// Whether the pixel totals match
        total_matched: bool,
        /// Whether the acceptable, warning and error buckets match
        buckets_matched: bool,
        /// Whether the scaled maximum errors match
        max_error_matched: bool,
        /// Whether the exact-match and 1% band counters match
        extended_matched: bool,
    },
}

impl CompareResult {
    pub fn is_match(&self) -> bool {
        matches!(self, CompareResult::Match)
    }
}

/// Compares counters produced by two backends for the same inputs
///
/// # Arguments
/// * `reference` - Counters from the trusted backend
/// * `tested` - Counters from the backend under verification
///
/// # Returns
/// A `CompareResult` indicating whether the counters match and which ones differ
pub fn compare_counters(reference: &StatisticsCounters, tested: &StatisticsCounters) -> CompareResult {
    // Counters of different layouts cannot be compared field by field
    if reference.layout() != tested.layout() {
        return CompareResult::LayoutMismatch {
            reference_layout: reference.layout(),
            tested_layout: tested.layout(),
        };
    }

    let total_matched = reference.total_pixels == tested.total_pixels;
    let buckets_matched = reference.acceptable_pixels == tested.acceptable_pixels
        && reference.warning_pixels == tested.warning_pixels
        && reference.error_pixels == tested.error_pixels;
    let max_error_matched = reference.max_error_scaled == tested.max_error_scaled;
    let extended_matched = reference.matched_pixels == tested.matched_pixels && reference.one_percent_error_pixels == tested.one_percent_error_pixels;

    if total_matched && buckets_matched && max_error_matched && extended_matched {
        CompareResult::Match
    } else {
        CompareResult::CounterMismatch {
            total_matched,
            buckets_matched,
            max_error_matched,
            extended_matched,
        }
    }
}
