//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Loads settings (config file, then command-line overrides)
//! 2. Groups the log into timestamp-delimited groups
//! 3. Filters the groups
//! 4. Computes quick stats and picks the groups to export
//! 5. Extracts records and profile trees, computes aggregates
//! 6. Writes output files

use super::models::{AnalyzeArgs, AnalyzeOutcome};
use super::utils::{load_groups, print_highlighted, resolve_settings, source_name};
use crate::aggregator::{build_collapsed_stacks, compute_aggregates, compute_quick_stats, slow_groups, stacks_to_text};
use crate::filter::filter_groups;
use crate::output::{default_export_name, render_export, write_report, write_text, AnalysisReport, ExportSummary};
use crate::parser::extract_records;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Config file read/parse failures
/// * Log file read failures
/// * File write errors
pub fn execute_analyze(args: AnalyzeArgs) -> Result<AnalyzeOutcome> {
    let start_time = Instant::now();

    info!("Analyzing log: {}", args.file.display());

    // Step 1: Settings
    info!("Step 1/6: Resolving settings...");
    let settings = resolve_settings(args.config.as_deref(), args.threshold_secs)?;
    let mut criteria = args.criteria.clone();
    if criteria.status_buckets.is_empty() {
        criteria.status_buckets = settings.status_buckets.clone();
    }
    if args.analysis {
        criteria.profiler_only = true;
    }
    debug!("Slow threshold: {} s, criteria: {:?}", settings.threshold_secs, criteria);

    // Step 2: Group
    info!("Step 2/6: Grouping log lines...");
    let groups = load_groups(&args.file)?;

    // Step 3: Filter
    info!("Step 3/6: Filtering {} groups...", groups.len());
    let filtered = filter_groups(&groups, &criteria);
    info!("{} of {} groups kept", filtered.len(), groups.len());

    // Step 4: Quick stats and export selection
    info!("Step 4/6: Scanning root timings...");
    let quick = compute_quick_stats(&filtered, settings.threshold_secs);
    let exported = if args.analysis && args.slow_only {
        slow_groups(&filtered, &quick)
    } else {
        filtered.clone()
    };

    // Step 5: Records, trees, aggregates
    info!("Step 5/6: Extracting profiling records...");
    let extraction = extract_records(&groups);
    let aggregates = compute_aggregates(&extraction.records, settings.threshold_secs * 1000.0);
    info!("Aggregates: {}", aggregates.summary());

    // Step 6: Outputs
    info!("Step 6/6: Writing output files...");
    let source = source_name(&args.file);

    let summary = args.analysis.then(|| ExportSummary {
        source: source.clone(),
        threshold_secs: settings.threshold_secs,
        slow_only: args.slow_only,
        stats: quick.stats,
    });
    let export = render_export(&exported, summary.as_ref());
    let export_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_export_name(source.as_deref(), args.analysis)));
    write_text(&export, &export_path).context("Failed to write filtered log export")?;
    info!("✓ Export written to: {}", export_path.display());

    if let Some(stacks_path) = &args.output_stacks {
        let stacks = build_collapsed_stacks(&extraction.trees);
        write_text(&stacks_to_text(&stacks), stacks_path).context("Failed to write collapsed stacks")?;
        info!("✓ Collapsed stacks written to: {}", stacks_path.display());
    }

    if args.print_groups {
        for group in &exported {
            for line in group.lines() {
                println!("{}", print_highlighted(line, &criteria));
            }
        }
    }

    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("ANALYSIS SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Source:          {}", source.as_deref().unwrap_or("N/A"));
        println!("Groups:          {} ({} after filtering)", groups.len(), filtered.len());
        println!("Records:         {}", extraction.records.len());
        println!("Profile trees:   {}", extraction.trees.len());
        println!("{}", aggregates.summary());
        println!(
            "Quick stats:     {} samples | Avg total {:.3} s | Max {:.3} s | Slow {} ({:.1}%)",
            quick.stats.count,
            quick.stats.avg_total(),
            quick.stats.max_total,
            quick.stats.slow_count,
            quick.stats.slow_percent()
        );
        println!("{}", "=".repeat(80));
    }

    let outcome = AnalyzeOutcome {
        total_groups: groups.len(),
        filtered_groups: filtered.len(),
        exported_groups: exported.len(),
        records: extraction.records.len(),
        export_path,
    };

    if let Some(json_path) = &args.output_json {
        let report = AnalysisReport::new(source, settings.threshold_secs, extraction, aggregates, quick.stats);
        write_report(&report, json_path).context("Failed to write analysis report JSON")?;
        info!("✓ Report written to: {}", json_path.display());
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(outcome)
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.file.as_os_str().is_empty() {
        anyhow::bail!("Log file path cannot be empty");
    }

    if let Some(threshold) = args.threshold_secs {
        if !threshold.is_finite() || threshold < 0.0 {
            anyhow::bail!("Threshold must be a non-negative number of seconds");
        }
    }

    if args.slow_only && !args.analysis {
        anyhow::bail!("--slow-only requires --analysis");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> AnalyzeArgs {
        AnalyzeArgs {
            file: PathBuf::from("app.log"),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_args(&args()).is_ok());
    }

    #[test]
    fn test_validate_args_empty_file() {
        let args = AnalyzeArgs::default();
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_negative_threshold() {
        let args = AnalyzeArgs {
            threshold_secs: Some(-1.0),
            ..args()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_slow_only_needs_analysis() {
        let args = AnalyzeArgs {
            slow_only: true,
            ..args()
        };
        assert!(validate_args(&args).is_err());

        let args = AnalyzeArgs {
            slow_only: true,
            analysis: true,
            ..args
        };
        assert!(validate_args(&args).is_ok());
    }
}
