//! Filtered log export text.
//!
//! The export is the newline-joined text of the chosen groups. In
//! profiling-analysis mode a fixed-width PROFILING SUMMARY block precedes it.

use crate::aggregator::quick_stats::QuickStats;
use crate::parser::schema::LogGroup;
use std::path::Path;

const SEPARATOR_WIDTH: usize = 60;

/// Values shown in the profiling summary header
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Source file name, `N/A` when unknown
    pub source: Option<String>,
    pub threshold_secs: f64,
    pub slow_only: bool,
    pub stats: QuickStats,
}

impl ExportSummary {
    /// Fixed-width header block; the body starts right after the section title line
    pub fn header(&self) -> String {
        let separator = "=".repeat(SEPARATOR_WIDTH);
        [
            separator.clone(),
            "PROFILING SUMMARY".to_string(),
            separator.clone(),
            format!("Source File        : {}", self.source.as_deref().unwrap_or("N/A")),
            format!("Threshold (s)      : {}", self.threshold_secs),
            format!("Slow Only Mode     : {}", self.slow_only),
            String::new(),
            format!("Requests           : {}", self.stats.count),
            format!("Avg Total (s)      : {:.3}", self.stats.avg_total()),
            format!("Avg Self (s)       : {:.3}", self.stats.avg_self()),
            format!("Max Total (s)      : {:.3}", self.stats.max_total),
            format!("Slow (>=threshold) : {}", self.stats.slow_count),
            format!("Slow %             : {:.1}%", self.stats.slow_percent()),
            separator,
            String::new(),
            "FILTERED PROFILING LOG ENTRIES".to_string(),
            String::new(),
        ]
        .join("\n")
    }
}

/// Render export text for the given groups
///
/// **Public** - main entry point for the filtered log export
///
/// The summary header is only written when a summary is supplied and it
/// counted at least one request.
pub fn render_export(groups: &[LogGroup], summary: Option<&ExportSummary>) -> String {
    let body = groups
        .iter()
        .map(LogGroup::text)
        .collect::<Vec<_>>()
        .join("\n");

    match summary {
        Some(summary) if summary.stats.count > 0 => summary.header() + &body,
        _ => body,
    }
}

/// Default export file name: `<stem>-profiling.txt` or `<stem>-filtered.txt`
///
/// Only the last extension is removed from the source name; without a
/// source the stem is `logs`.
pub fn default_export_name(source: Option<&str>, analysis: bool) -> String {
    let base = source
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .map(strip_extension)
        .unwrap_or("logs");
    let suffix = if analysis { "profiling" } else { "filtered" };
    format!("{}-{}.txt", base, suffix)
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[..dot],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stats() -> QuickStats {
        QuickStats {
            count: 4,
            total: 1.0,
            self_total: 0.2,
            max_total: 0.5,
            slow_count: 1,
        }
    }

    fn groups() -> Vec<LogGroup> {
        vec![
            LogGroup::new(None, vec!["a".to_string(), "b".to_string()]),
            LogGroup::new(None, vec!["c".to_string()]),
        ]
    }

    #[test]
    fn test_plain_export() {
        assert_eq!(render_export(&groups(), None), "a\nb\nc");
    }

    #[test]
    fn test_summary_header_layout() {
        let summary = ExportSummary {
            source: Some("app.log".to_string()),
            threshold_secs: 0.05,
            slow_only: true,
            stats: stats(),
        };
        let sep = "=".repeat(60);
        let expected = format!(
            "{sep}\nPROFILING SUMMARY\n{sep}\n\
             Source File        : app.log\n\
             Threshold (s)      : 0.05\n\
             Slow Only Mode     : true\n\
             \n\
             Requests           : 4\n\
             Avg Total (s)      : 0.250\n\
             Avg Self (s)       : 0.050\n\
             Max Total (s)      : 0.500\n\
             Slow (>=threshold) : 1\n\
             Slow %             : 25.0%\n\
             {sep}\n\
             \n\
             FILTERED PROFILING LOG ENTRIES\n\
             a\nb\nc"
        );
        assert_eq!(render_export(&groups(), Some(&summary)), expected);
    }

    #[test]
    fn test_summary_skipped_without_requests() {
        let summary = ExportSummary {
            source: None,
            threshold_secs: 0.05,
            slow_only: false,
            stats: QuickStats::default(),
        };
        assert_eq!(render_export(&groups(), Some(&summary)), "a\nb\nc");
        assert!(summary.header().contains("Source File        : N/A"));
    }

    #[test]
    fn test_default_export_name() {
        assert_eq!(default_export_name(Some("app.2024.log"), true), "app.2024-profiling.txt");
        assert_eq!(default_export_name(Some("/var/log/app.log"), false), "app-filtered.txt");
        assert_eq!(default_export_name(Some("README"), false), "README-filtered.txt");
        assert_eq!(default_export_name(None, false), "logs-filtered.txt");
    }
}
