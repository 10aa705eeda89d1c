//! Single-pass quick statistics over root timing lines.
//!
//! Each group contributes at most one sample per timing shape; a sample
//! logged with count N is counted N times. Times are seconds.

use crate::parser::schema::LogGroup;
use crate::parser::timing::scan_group;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Running totals of captured root timings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub count: u64,
    pub total: f64,
    pub self_total: f64,
    pub max_total: f64,
    pub slow_count: u64,
}

impl QuickStats {
    /// Add one sample that was logged `n` times
    fn record_n(&mut self, total: f64, self_time: f64, slow: bool, n: u64) {
        self.count = self.count.saturating_add(n);
        self.total += total * n as f64;
        self.self_total += self_time * n as f64;
        self.max_total = self.max_total.max(total);
        if slow {
            self.slow_count = self.slow_count.saturating_add(n);
        }
    }

    pub fn avg_total(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    pub fn avg_self(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.self_total / self.count as f64
        }
    }

    pub fn slow_percent(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.slow_count as f64 / self.count as f64 * 100.0
        }
    }
}

/// Quick stats together with the indices of groups that held a slow sample
///
/// **Public** - returned from compute_quick_stats
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuickStatsReport {
    pub stats: QuickStats,
    pub slow_groups: BTreeSet<usize>,
}

impl QuickStatsReport {
    /// Was the group at `index` marked slow
    pub fn is_slow(&self, index: usize) -> bool {
        self.slow_groups.contains(&index)
    }
}

/// Scan every group for root timing lines
///
/// **Public** - main entry point for quick statistics
///
/// # Arguments
/// * `groups` - Groups to scan, usually the filtered view
/// * `slow_threshold_secs` - Samples with total >= this mark their group slow
pub fn compute_quick_stats(groups: &[LogGroup], slow_threshold_secs: f64) -> QuickStatsReport {
    let mut report = QuickStatsReport::default();

    for (index, group) in groups.iter().enumerate() {
        for sample in scan_group(group.lines()) {
            let slow = sample.total >= slow_threshold_secs;
            report
                .stats
                .record_n(sample.total, sample.self_time, slow, sample.count);
            if slow {
                report.slow_groups.insert(index);
            }
        }
    }

    debug!(
        "Quick stats: {} samples, {} slow groups",
        report.stats.count,
        report.slow_groups.len()
    );

    report
}

/// Groups marked slow, in their original order
pub fn slow_groups(groups: &[LogGroup], report: &QuickStatsReport) -> Vec<LogGroup> {
    groups
        .iter()
        .enumerate()
        .filter(|(index, _)| report.is_slow(*index))
        .map(|(_, group)| group.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grouper::group_text;

    const LOG: &str = "\
[2024-01-01 10:00:00.000 +00:00] [Info] Profiling.ProfileService request
- /api/data\tPOST\t2\t0.250 / 0.040
[2024-01-01 10:00:01.000 +00:00] [Info] Profiling.ProfileService request
- /api/data\tPOST\t1\t0.010 / 0.002
[2024-01-01 10:00:02.000 +00:00] [Warn] Too long execution
- (!)KeepUpSsoConnectionJob\t1\t24.045 (10)
[2024-01-01 10:00:03.000 +00:00] [Info] nothing to see";

    #[test]
    fn test_quick_stats_counts_and_slow_groups() {
        let groups = group_text(LOG);
        let report = compute_quick_stats(&groups, 0.05);

        assert_eq!(report.stats.count, 4);
        assert!((report.stats.total - (0.25 * 2.0 + 0.01 + 24.045)).abs() < 1e-9);
        assert!((report.stats.self_total - (0.04 * 2.0 + 0.002)).abs() < 1e-9);
        assert_eq!(report.stats.max_total, 24.045);
        assert_eq!(report.stats.slow_count, 3);
        assert_eq!(report.slow_groups, BTreeSet::from([0, 2]));
        assert!(report.is_slow(0));
        assert!(!report.is_slow(1));
        assert_eq!(report.stats.slow_percent(), 75.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let groups = group_text("- /api/data POST 1 0.050 / 0.010");
        let report = compute_quick_stats(&groups, 0.05);
        assert_eq!(report.stats.slow_count, 1);
    }

    #[test]
    fn test_slow_groups_view() {
        let groups = group_text(LOG);
        let report = compute_quick_stats(&groups, 1.0);
        let slow = slow_groups(&groups, &report);
        assert_eq!(slow.len(), 1);
        assert!(slow[0].lines()[0].contains("Too long execution"));
    }

    #[test]
    fn test_huge_count_is_weighted_not_looped() {
        let groups = group_text(&format!("- /api/data POST {} 0.100 / 0.010", u64::MAX));
        let report = compute_quick_stats(&groups, 0.05);
        assert_eq!(report.stats.count, u64::MAX);
        assert_eq!(report.stats.slow_count, u64::MAX);
        assert_eq!(report.stats.max_total, 0.1);
        assert!((report.stats.avg_total() - 0.1).abs() < 1e-9);
        assert_eq!(report.stats.slow_percent(), 100.0);
    }

    #[test]
    fn test_counts_saturate() {
        let line = format!("- /api/data POST {} 0.100 / 0.010", u64::MAX);
        let groups = group_text(&format!(
            "[2024-01-01 10:00:00.000 +00:00] a\n{line}\n[2024-01-01 10:00:01.000 +00:00] b\n{line}"
        ));
        let report = compute_quick_stats(&groups, 0.05);
        assert_eq!(report.stats.count, u64::MAX);
        assert_eq!(report.slow_groups.len(), 2);
    }

    #[test]
    fn test_no_samples() {
        let report = compute_quick_stats(&group_text("[2024-01-01 10:00:00.000 +00:00] idle"), 0.05);
        assert_eq!(report.stats, QuickStats::default());
        assert_eq!(report.stats.avg_total(), 0.0);
        assert_eq!(report.stats.slow_percent(), 0.0);
        assert!(report.slow_groups.is_empty());
    }
}
