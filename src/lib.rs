//! LogTrace Studio
//!
//! Request latency telemetry reconstructed from free-form,
//! multi-line application logs.
//!
//! This crate provides the core implementation for the
//! `logtrace` CLI tool: grouping raw lines into timestamp-delimited
//! groups, extracting per-request profiling records and execution-profile
//! trees, filtering, and aggregate latency statistics.
//!
//! ## Getting Started
//!
//! ```bash
//! logtrace analyze --file app.log --analysis --summary
//! logtrace --help
//! ```

pub mod aggregator;
pub mod commands;
pub mod filter;
pub mod output;
pub mod parser;
pub mod utils;
