//! Host-side view over read-back counters
//!
//! Ratios are derived on every call from the stored counters and never cached.

use crate::accumulator::StatisticsCounters;

/// Decoded statistics of one completed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationResult {
    counters: StatisticsCounters,
}

impl ValidationResult {
    /// Wraps the counters of a completed dispatch
    pub fn from_counters(counters: StatisticsCounters) -> Self {
        Self { counters }
    }

    pub fn counters(&self) -> &StatisticsCounters {
        &self.counters
    }

    pub fn total_pixels(&self) -> u32 {
        self.counters.total_pixels
    }

    /// Maximum error distance, accurate to `1 / SCALE`
    pub fn max_error(&self) -> f32 {
        self.counters.max_error()
    }

    /// Divides a counter by the pixel total, yielding 0 for an empty run
    fn ratio(&self, count: u32) -> f32 {
        if self.counters.total_pixels == 0 {
            return 0.0;
        }
        (count as f64 / self.counters.total_pixels as f64) as f32
    }

    pub fn acceptable_ratio(&self) -> f32 {
        self.ratio(self.counters.acceptable_pixels)
    }

    pub fn warning_ratio(&self) -> f32 {
        self.ratio(self.counters.warning_pixels)
    }

    pub fn error_ratio(&self) -> f32 {
        self.ratio(self.counters.error_pixels)
    }

    /// Share of pixels outside the acceptable band (warning plus error)
    pub fn unacceptable_ratio(&self) -> f32 {
        self.ratio(self.counters.warning_pixels.saturating_add(self.counters.error_pixels))
    }

    /// Share of near-exact matches, when the layout tracks them
    pub fn match_ratio(&self) -> Option<f32> {
        self.counters.matched_pixels.map(|count| self.ratio(count))
    }

    /// Share of pixels beyond the 1% band, when the layout tracks them
    pub fn one_percent_error_ratio(&self) -> Option<f32> {
        self.counters.one_percent_error_pixels.map(|count| self.ratio(count))
    }
}

impl From<StatisticsCounters> for ValidationResult {
    fn from(counters: StatisticsCounters) -> Self {
        Self::from_counters(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(total: u32, acceptable: u32, warning: u32, error: u32) -> StatisticsCounters {
        StatisticsCounters {
            total_pixels: total,
            acceptable_pixels: acceptable,
            warning_pixels: warning,
            error_pixels: error,
            ..Default::default()
        }
    }

    #[test]
    fn test_ratios() {
        let result = ValidationResult::from_counters(counters(200, 190, 6, 4));
        assert_eq!(result.acceptable_ratio(), 0.95);
        assert_eq!(result.warning_ratio(), 0.03);
        assert_eq!(result.error_ratio(), 0.02);
        assert_eq!(result.unacceptable_ratio(), 0.05);
        assert_eq!(result.match_ratio(), None);
    }

    #[test]
    fn test_empty_run_yields_zero_ratios() {
        let result = ValidationResult::from_counters(StatisticsCounters {
            matched_pixels: Some(0),
            one_percent_error_pixels: Some(0),
            ..Default::default()
        });
        assert_eq!(result.acceptable_ratio(), 0.0);
        assert_eq!(result.warning_ratio(), 0.0);
        assert_eq!(result.error_ratio(), 0.0);
        assert_eq!(result.unacceptable_ratio(), 0.0);
        assert_eq!(result.match_ratio(), Some(0.0));
        assert_eq!(result.one_percent_error_ratio(), Some(0.0));
        assert_eq!(result.max_error(), 0.0);
    }

    #[test]
    fn test_max_error_is_decoded() {
        let result = ValidationResult::from_counters(StatisticsCounters {
            total_pixels: 1,
            error_pixels: 1,
            max_error_scaled: 1234,
            ..Default::default()
        });
        assert_eq!(result.max_error(), 0.1234);
    }

    #[test]
    fn test_extended_ratios() {
        let result = ValidationResult::from_counters(StatisticsCounters {
            total_pixels: 8,
            matched_pixels: Some(6),
            acceptable_pixels: 8,
            one_percent_error_pixels: Some(1),
            ..Default::default()
        });
        assert_eq!(result.match_ratio(), Some(0.75));
        assert_eq!(result.one_percent_error_ratio(), Some(0.125));
    }
}
