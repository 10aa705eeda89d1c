//! LogTrace Studio CLI
//!
//! Reconstructs per-request latency telemetry from free-form application logs.
//! Filters log groups, exports them, and reports latency statistics.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use logtrace_studio::commands::{
    display_version, execute_analyze, execute_stats, execute_tree, validate_args, AnalyzeArgs,
};
use logtrace_studio::filter::FilterCriteria;

/// LogTrace Studio - request latency telemetry from raw logs
#[derive(Parser, Debug)]
#[command(name = "logtrace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Group, filter and export a log, with optional profiling analysis
    Analyze {
        /// Log file to analyze
        #[arg(short, long)]
        file: PathBuf,

        /// Keep groups containing this text (case-insensitive)
        #[arg(long)]
        id: Option<String>,

        /// Keep groups with any SignalR or hub marker
        #[arg(long)]
        filter_signalr: bool,

        /// Keep groups with the [SignalR] marker
        #[arg(long)]
        highlight_signalr: bool,

        /// Keep groups with the hub marker
        #[arg(long)]
        highlight_hub: bool,

        /// Keep groups with an HTTP status in these buckets (100, 200, 300, 400, 500)
        #[arg(long, num_args = 1..)]
        status: Vec<u16>,

        /// Regroup by request/response correlation id
        #[arg(long)]
        request_response: bool,

        /// Keep only groups with profiler output
        #[arg(long)]
        profiler_only: bool,

        /// Profiling-analysis mode (implies --profiler-only)
        #[arg(long)]
        analysis: bool,

        /// Export only slow groups (requires --analysis)
        #[arg(long)]
        slow_only: bool,

        /// Slow threshold in seconds
        #[arg(long)]
        threshold: Option<f64>,

        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Export path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON analysis report
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write collapsed stacks of the profile trees
        #[arg(long)]
        stacks: Option<PathBuf>,

        /// Print statistics to stdout
        #[arg(long)]
        summary: bool,

        /// Print the exported groups with highlights
        #[arg(long)]
        print: bool,
    },

    /// Print the execution-profile tree for one correlation id
    Tree {
        /// Log file to read
        #[arg(short, long)]
        file: PathBuf,

        /// Response id the tree is stored under
        #[arg(long)]
        id: String,
    },

    /// Print aggregate latency statistics for every record
    Stats {
        /// Log file to read
        #[arg(short, long)]
        file: PathBuf,

        /// Slow threshold in seconds
        #[arg(long)]
        threshold: Option<f64>,

        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            file,
            id,
            filter_signalr,
            highlight_signalr,
            highlight_hub,
            status,
            request_response,
            profiler_only,
            analysis,
            slow_only,
            threshold,
            config,
            output,
            json,
            stacks,
            summary,
            print,
        } => {
            let mut criteria = FilterCriteria::new()
                .with_status_buckets(&status)?
                .with_request_response(request_response)
                .with_profiler_only(profiler_only);
            criteria.identifier = id;
            criteria.filter_signalr = filter_signalr;
            criteria.highlight_signalr = highlight_signalr;
            criteria.highlight_hub = highlight_hub;

            let args = AnalyzeArgs {
                file,
                criteria,
                analysis,
                slow_only,
                threshold_secs: threshold,
                config,
                output,
                output_json: json,
                output_stacks: stacks,
                print_summary: summary,
                print_groups: print,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Tree { file, id } => {
            execute_tree(&file, &id)?;
        }

        Commands::Stats {
            file,
            threshold,
            config,
        } => {
            execute_stats(&file, config.as_deref(), threshold)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
