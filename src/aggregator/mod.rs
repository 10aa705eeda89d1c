//! Aggregation of extracted telemetry into statistics and stacks.
//!
//! This module transforms parsed groups and records into:
//! - Latency statistics over profiling records
//! - Quick statistics over root timing lines, with slow-group marks
//! - Collapsed stacks of profile trees (for flamegraph tooling)

pub mod metrics;
pub mod quick_stats;
pub mod stack_builder;

// Re-export main types and functions
pub use metrics::{compute_aggregates, percentile, AggregateStats};
pub use quick_stats::{compute_quick_stats, slow_groups, QuickStats, QuickStatsReport};
pub use stack_builder::{build_collapsed_stacks, stacks_to_text, CollapsedStack};
