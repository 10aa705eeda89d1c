//! Narrowing and marking of log groups.
//!
//! This module handles:
//! - Caller-supplied filter criteria
//! - The ordered filter pipeline
//! - Highlight spans for renderers

pub mod criteria;
pub mod highlight;
pub mod pipeline;

// Re-export main types and functions
pub use criteria::FilterCriteria;
pub use highlight::{highlight_spans, render_spans, HighlightKind, HighlightSpan};
pub use pipeline::filter_groups;
