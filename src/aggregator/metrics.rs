//! Latency statistics over profiling records.
//!
//! Percentiles interpolate linearly between order statistics and the
//! standard deviation is the population one (divide by n). Records without
//! a duration are left out rather than counted as zero.

use crate::parser::schema::ProfilingRecord;
use log::debug;
use serde::{Deserialize, Serialize};

/// Aggregate request latency statistics (milliseconds)
///
/// **Public** - returned from compute_aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub count: usize,
    pub avg: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,

    /// Requests slower than the threshold
    pub slow_count: usize,
    pub slow_percent: f64,

    /// Share of wall time spent executing: sum(core) / sum(wall)
    pub core_share: f64,
}

impl AggregateStats {
    /// Get human-readable summary
    ///
    /// **Public** - for logging and terminal output
    pub fn summary(&self) -> String {
        format!(
            "Requests: {} | Avg: {:.1} ms | p50: {:.1} | p90: {:.1} | p95: {:.1} | p99: {:.1} | Max: {:.1} | Slow: {} ({:.1}%) | Core share: {:.1}%",
            self.count,
            self.avg,
            self.p50,
            self.p90,
            self.p95,
            self.p99,
            self.max,
            self.slow_count,
            self.slow_percent,
            self.core_share * 100.0
        )
    }
}

/// Linearly interpolated percentile of an ascending slice
///
/// The rank is `(p / 100) * (n - 1)`; fractional ranks blend the floor
/// and ceiling order statistics. An empty slice yields 0. `p` is clamped
/// to `0..=100`, and NaN reads as 0.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Compute aggregate statistics over a record set
///
/// **Public** - main entry point for record statistics
///
/// # Arguments
/// * `records` - Extracted profiling records
/// * `slow_threshold_ms` - Durations above this count as slow
pub fn compute_aggregates(records: &[ProfilingRecord], slow_threshold_ms: f64) -> AggregateStats {
    let mut values: Vec<f64> = records.iter().filter_map(|r| r.duration_ms).collect();
    if values.is_empty() {
        return AggregateStats::default();
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let count = values.len();
    let n = count as f64;
    let avg = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;
    let slow_count = values.iter().filter(|&&v| v > slow_threshold_ms).count();

    let wall_sum: f64 = records.iter().filter_map(|r| r.wall_ms).sum();
    let core_sum: f64 = records.iter().filter_map(|r| r.core_ms).sum();
    let core_share = if wall_sum != 0.0 { core_sum / wall_sum } else { 0.0 };

    debug!("Computed aggregates over {} durations", count);

    AggregateStats {
        count,
        avg,
        p50: percentile(&values, 50.0),
        p90: percentile(&values, 90.0),
        p95: percentile(&values, 95.0),
        p99: percentile(&values, 99.0),
        min: values[0],
        max: values[count - 1],
        std_dev: variance.sqrt(),
        slow_count,
        slow_percent: slow_count as f64 / n * 100.0,
        core_share,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(duration: Option<f64>, wall: Option<f64>, core: Option<f64>) -> ProfilingRecord {
        ProfilingRecord {
            response_id: "id".to_string(),
            duration_ms: duration,
            wall_ms: wall,
            core_ms: core,
            ..ProfilingRecord::default()
        }
    }

    #[test]
    fn test_percentile_boundaries() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&values, 0.0), 10.0);
        assert_eq!(percentile(&values, 100.0), 40.0);
        assert_eq!(percentile(&values, 50.0), 25.0);
        assert_eq!(percentile(&[7.0], 90.0), 7.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_percentile_out_of_range() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 150.0), 3.0);
        assert_eq!(percentile(&values, -5.0), 1.0);
        assert_eq!(percentile(&values, f64::NAN), 1.0);
    }

    #[test]
    fn test_compute_aggregates() {
        let records = vec![
            record(Some(40.0), Some(40.0), Some(10.0)),
            record(Some(10.0), None, None),
            record(Some(30.0), Some(60.0), Some(20.0)),
            record(Some(20.0), None, None),
        ];

        let stats = compute_aggregates(&records, 25.0);

        assert_eq!(stats.count, 4);
        assert_eq!(stats.avg, 25.0);
        assert_eq!(stats.p50, 25.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert!((stats.std_dev - 125.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(stats.slow_count, 2);
        assert_eq!(stats.slow_percent, 50.0);
        assert!((stats.core_share - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_missing_durations_excluded() {
        let records = vec![record(None, Some(5.0), Some(1.0)), record(Some(8.0), None, None)];
        let stats = compute_aggregates(&records, 100.0);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.avg, 8.0);
        assert_eq!(stats.slow_count, 0);
    }

    #[test]
    fn test_empty_records() {
        let stats = compute_aggregates(&[], 100.0);
        assert_eq!(stats, AggregateStats::default());
        assert!(stats.summary().starts_with("Requests: 0"));
    }

    #[test]
    fn test_core_share_zero_without_wall() {
        let stats = compute_aggregates(&[record(Some(1.0), None, Some(3.0))], 100.0);
        assert_eq!(stats.core_share, 0.0);
    }
}
