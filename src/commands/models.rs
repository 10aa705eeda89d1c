use crate::filter::FilterCriteria;
use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Log file to read
    pub file: PathBuf,

    /// Filter criteria from the command line
    pub criteria: FilterCriteria,

    /// Profiling-analysis mode (quick stats and summary header)
    pub analysis: bool,

    /// Export only the groups marked slow (analysis mode)
    pub slow_only: bool,

    /// Slow threshold in seconds, overriding the config file
    pub threshold_secs: Option<f64>,

    /// Optional TOML config
    pub config: Option<PathBuf>,

    /// Export path (defaults to `<stem>-filtered.txt` / `<stem>-profiling.txt`)
    pub output: Option<PathBuf>,

    /// Optional JSON analysis report
    pub output_json: Option<PathBuf>,

    /// Optional collapsed stacks file
    pub output_stacks: Option<PathBuf>,

    /// Print statistics to stdout
    pub print_summary: bool,

    /// Print the exported groups to stdout with ANSI highlights
    pub print_groups: bool,
}

/// What an analyze run produced
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeOutcome {
    /// Groups read from the source
    pub total_groups: usize,

    /// Groups left after filtering
    pub filtered_groups: usize,

    /// Groups written to the export
    pub exported_groups: usize,

    /// Profiling records extracted
    pub records: usize,

    /// Where the export was written
    pub export_path: PathBuf,
}
