//! Data model shared by the grouping, extraction and statistics stages.
//!
//! Records and trees serialize with camelCase names so the JSON report
//! reads the same way the log fields are named.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A contiguous run of raw lines sharing one timestamp boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroup {
    /// Boundary that opened this group (bracketed timestamp as it appeared)
    boundary: Option<String>,

    /// Raw lines, in source order
    lines: Vec<String>,
}

impl LogGroup {
    pub fn new(boundary: Option<String>, lines: Vec<String>) -> Self {
        Self { boundary, lines }
    }

    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub(crate) fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The group as one newline-joined block of text
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// True if any line satisfies the predicate
    pub fn any_line(&self, mut predicate: impl FnMut(&str) -> bool) -> bool {
        self.lines.iter().any(|line| predicate(line))
    }
}

/// One row of request telemetry, keyed by correlation id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilingRecord {
    /// Raw timestamp text (empty when only the profiler saw the request)
    pub timestamp: String,

    pub response_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Middleware-measured duration, or profiler wall time as fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_ms: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_ms: Option<f64>,

    /// wall - core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_ms: Option<f64>,

    /// wait / duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_ratio: Option<f64>,
}

/// A node of an execution-profile call tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileNode {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,

    /// Inclusive wall time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_ms: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_ms: Option<f64>,

    /// Wall time minus the children's wall time
    pub self_wall_ms: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,

    #[serde(default)]
    pub children: Vec<ProfileNode>,

    /// Normalized indentation width of the source line
    pub depth: usize,
}

impl ProfileNode {
    /// Number of nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ProfileNode::node_count).sum::<usize>()
    }

    /// Sum of self wall time over the whole subtree
    pub fn subtree_self_wall_ms(&self) -> f64 {
        self.self_wall_ms
            + self
                .children
                .iter()
                .map(ProfileNode::subtree_self_wall_ms)
                .sum::<f64>()
    }
}

/// Execution-profile trees keyed by correlation id
///
/// A later tree for the same id replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileTreeStore {
    trees: BTreeMap<String, ProfileNode>,
}

impl ProfileTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a tree, returning the tree it replaced
    pub fn insert(&mut self, response_id: impl Into<String>, tree: ProfileNode) -> Option<ProfileNode> {
        self.trees.insert(response_id.into(), tree)
    }

    pub fn get(&self, response_id: &str) -> Option<&ProfileNode> {
        self.trees.get(response_id)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProfileNode)> {
        self.trees.iter()
    }
}

/// Everything one extraction pass produces
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<ProfilingRecord>,
    pub trees: ProfileTreeStore,
}
