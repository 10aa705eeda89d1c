//! Log parsing: grouping, record extraction and profile trees.
//!
//! This module handles:
//! - Splitting raw lines into timestamp-delimited groups
//! - Extracting per-request profiling records
//! - Rebuilding execution-profile call trees
//! - Recognizing root timing lines for quick statistics

pub mod grouper;
pub mod profile_tree;
pub mod records;
pub mod schema;
pub mod timing;

// Re-export main types
pub use grouper::{extract_timestamp, group_lines, group_reader, group_text, stream_groups, LineGrouper};
pub use profile_tree::build_tree;
pub use records::extract_records;
pub use schema::{Extraction, LogGroup, ProfileNode, ProfileTreeStore, ProfilingRecord};
pub use timing::{TimingLineMatcher, TimingSample, TimingShape};
