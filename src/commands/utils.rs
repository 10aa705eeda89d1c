use crate::aggregator::compute_aggregates;
use crate::filter::{highlight_spans, render_spans, FilterCriteria, HighlightKind};
use crate::parser::schema::{LogGroup, ProfileNode};
use crate::parser::{extract_records, group_reader};
use crate::utils::config::{load_config, AnalysisConfig, SCHEMA_VERSION};
use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const ANSI_RESET: &str = "\x1b[0m";

/// Settings after merging the config file with command-line overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub threshold_secs: f64,
    pub status_buckets: Vec<u16>,
}

/// Load the optional config file and apply the threshold override
pub fn resolve_settings(config_path: Option<&Path>, threshold_secs: Option<f64>) -> Result<ResolvedSettings> {
    let config = match config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(threshold) = threshold_secs {
        if !threshold.is_finite() || threshold < 0.0 {
            anyhow::bail!("Threshold must be a non-negative number of seconds, got {}", threshold);
        }
    }

    Ok(ResolvedSettings {
        threshold_secs: threshold_secs.unwrap_or(config.analysis.slow_threshold_secs),
        status_buckets: config.filter.status_buckets,
    })
}

/// Read and group a log file
pub fn load_groups(path: &Path) -> Result<Vec<LogGroup>> {
    let file = File::open(path).with_context(|| format!("Failed to open log file {}", path.display()))?;
    let groups = group_reader(BufReader::new(file))
        .with_context(|| format!("Failed to read log file {}", path.display()))?;
    info!("Read {} groups from {}", groups.len(), path.display());
    Ok(groups)
}

/// File name of the source, used in summaries and export names
pub fn source_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// Line with highlight spans wrapped in ANSI colors
pub fn print_highlighted(line: &str, criteria: &FilterCriteria) -> String {
    let spans = highlight_spans(line, criteria);
    render_spans(line, &spans, |kind, text| {
        let color = match kind {
            HighlightKind::Identifier => "\x1b[1;33m",
            HighlightKind::HttpStatus => "\x1b[1;31m",
            HighlightKind::ProfileRoot => "\x1b[1;36m",
        };
        format!("{}{}{}", color, text, ANSI_RESET)
    })
}

/// Render a profile tree, one node per line, indented two spaces per level
pub fn format_tree(root: &ProfileNode) -> String {
    let mut out = Vec::new();
    format_node(root, 0, &mut out);
    out.join("\n")
}

fn format_node(node: &ProfileNode, level: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(level);
    let mut line = format!("{}{}", indent, node.name);
    if let Some(count) = node.count {
        line.push_str(&format!("  x{}", count));
    }
    if let Some(wall) = node.wall_ms {
        line.push_str(&format!("  wall {:.3} ms", wall));
    }
    if let Some(core) = node.core_ms {
        line.push_str(&format!("  core {:.3} ms", core));
    }
    line.push_str(&format!("  self {:.3} ms", node.self_wall_ms));
    out.push(line);

    for annotation in &node.annotations {
        out.push(format!("{}  > {}", indent, annotation));
    }
    for child in &node.children {
        format_node(child, level + 1, out);
    }
}

/// Print the execution-profile tree stored for one correlation id
pub fn execute_tree(file: &Path, response_id: &str) -> Result<()> {
    let groups = load_groups(file)?;
    let extraction = extract_records(&groups);

    let Some(tree) = extraction.trees.get(response_id) else {
        anyhow::bail!(
            "No execution profile for {} ({} trees in {})",
            response_id,
            extraction.trees.len(),
            file.display()
        );
    };

    println!("Execution profile for {} ({} nodes)", response_id, tree.node_count());
    println!("{}", format_tree(tree));

    Ok(())
}

/// Print aggregate statistics for every record in a log
pub fn execute_stats(file: &Path, config: Option<&Path>, threshold_secs: Option<f64>) -> Result<()> {
    let settings = resolve_settings(config, threshold_secs)?;
    let groups = load_groups(file)?;
    let extraction = extract_records(&groups);
    let stats = compute_aggregates(&extraction.records, settings.threshold_secs * 1000.0);

    println!("Records:     {}", extraction.records.len());
    println!("Threshold:   {} s", settings.threshold_secs);
    println!("Average:     {:.3} ms", stats.avg);
    println!("p50/p90:     {:.3} / {:.3} ms", stats.p50, stats.p90);
    println!("p95/p99:     {:.3} / {:.3} ms", stats.p95, stats.p99);
    println!("Min/Max:     {:.3} / {:.3} ms", stats.min, stats.max);
    println!("Std dev:     {:.3} ms", stats.std_dev);
    println!("Slow:        {} ({:.1}%)", stats.slow_count, stats.slow_percent);
    println!("Core share:  {:.1}%", stats.core_share * 100.0);

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("LogTrace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Request latency telemetry from free-form application logs.");
}
