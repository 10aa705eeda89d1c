//! JSON analysis report writer.
//!
//! Writes AnalysisReport structs to JSON files with proper formatting.

use super::{calculate_file_size, prepare_output_path};
use crate::aggregator::metrics::AggregateStats;
use crate::aggregator::quick_stats::QuickStats;
use crate::parser::schema::{Extraction, ProfileTreeStore, ProfilingRecord};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Everything one analysis run produced
///
/// **Public** - the on-disk JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Report schema version
    pub version: String,

    /// Source log name, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// RFC 3339 generation time
    pub generated_at: String,

    /// Slow threshold in seconds
    pub threshold: f64,

    pub records: Vec<ProfilingRecord>,
    pub aggregates: AggregateStats,
    pub quick_stats: QuickStats,
    pub trees: ProfileTreeStore,
}

impl AnalysisReport {
    /// Assemble a report stamped with the current time
    pub fn new(
        source: Option<String>,
        threshold: f64,
        extraction: Extraction,
        aggregates: AggregateStats,
        quick_stats: QuickStats,
    ) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            source,
            generated_at: chrono::Utc::now().to_rfc3339(),
            threshold,
            records: extraction.records,
            aggregates,
            quick_stats,
            trees: extraction.trees,
        }
    }
}

/// Write a report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_report(report: &AnalysisReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());

    prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, report).map_err(OutputError::SerializationFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    info!(
        "Report written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Read a report from a JSON file
///
/// **Public** - useful for validation and testing
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<AnalysisReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let report: AnalysisReport =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Report loaded: version {}, {} records",
        report.version,
        report.records.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::ProfileNode;
    use tempfile::NamedTempFile;

    fn create_test_report() -> AnalysisReport {
        let mut trees = ProfileTreeStore::new();
        trees.insert(
            "11111111-2222-3333-4444-555555555555",
            ProfileNode {
                name: "Root".to_string(),
                wall_ms: Some(12.0),
                self_wall_ms: 12.0,
                ..ProfileNode::default()
            },
        );
        let extraction = Extraction {
            records: vec![ProfilingRecord {
                timestamp: "2024-01-01 10:00:00.000 +00:00".to_string(),
                response_id: "11111111-2222-3333-4444-555555555555".to_string(),
                duration_ms: Some(12.0),
                ..ProfilingRecord::default()
            }],
            trees,
        };
        AnalysisReport::new(
            Some("app.log".to_string()),
            0.05,
            extraction,
            AggregateStats::default(),
            QuickStats::default(),
        )
    }

    #[test]
    fn test_write_and_read_report() {
        let report = create_test_report();
        let temp_file = NamedTempFile::new().unwrap();

        write_report(&report, temp_file.path()).unwrap();
        let loaded = read_report(temp_file.path()).unwrap();

        assert_eq!(loaded.version, SCHEMA_VERSION);
        assert_eq!(loaded.source.as_deref(), Some("app.log"));
        assert_eq!(loaded.generated_at, report.generated_at);
        assert_eq!(loaded.records, report.records);
        assert_eq!(loaded.trees.len(), 1);
    }

    #[test]
    fn test_report_field_names() {
        let json = serde_json::to_value(create_test_report()).unwrap();
        assert!(json.get("generatedAt").is_some());
        assert!(json.get("quickStats").is_some());
        assert_eq!(json["records"][0]["responseId"], "11111111-2222-3333-4444-555555555555");
        assert!(json["records"][0].get("wallMs").is_none());
        assert_eq!(json["trees"]["11111111-2222-3333-4444-555555555555"]["name"], "Root");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/report.json");

        write_report(&create_test_report(), &nested_path).unwrap();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_written_report_is_complete_json() {
        let temp_file = NamedTempFile::new().unwrap();
        write_report(&create_test_report(), temp_file.path()).unwrap();

        let text = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(text.trim_end().ends_with('}'));
        assert_eq!(calculate_file_size(temp_file.path()), text.len() as u64);
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = read_report(temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(OutputError::WriteFailed(_))));
    }
}
