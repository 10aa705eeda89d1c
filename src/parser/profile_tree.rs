//! Rebuild execution-profile call trees from indented log blocks.
//!
//! A block looks like:
//!
//! ```text
//! Execution profile:
//! - /api/data POST	1	0.326 / 0.001
//!   - EnvController.selectApp	1	0.300 / 0.120
//!     > cache miss for workspace
//!     - Repository.Load	3	0.180
//! End Http Response
//! ```
//!
//! Node depth is the width of the leading whitespace with tabs expanded to
//! tab stops. Times are seconds in the log and milliseconds in the tree.

use super::grouper::starts_with_timestamp;
use super::schema::ProfileNode;
use crate::utils::config::{END_RESPONSE_MARKER, EXECUTION_PROFILE_MARKER, TAB_WIDTH};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

static NODE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)-\s(.+)$").expect("Invalid node line regex"));

static ANNOTATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)>\s(.+)").expect("Invalid annotation line regex"));

static BLOCK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[->]").expect("Invalid block line regex"));

static COLUMN_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+| {2,}").expect("Invalid column separator regex"));

static DUAL_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.\d+)\s*/\s*(\d+\.\d+)").expect("Invalid dual timing regex")
});

static SINGLE_TIMING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").expect("Invalid single timing regex"));

/// Width of leading whitespace, tabs advancing to the next tab stop
pub fn indent_width(indent: &str) -> usize {
    indent.chars().fold(0, |width, c| {
        if c == '\t' {
            (width / TAB_WIDTH + 1) * TAB_WIDTH
        } else {
            width + 1
        }
    })
}

/// True if the line is the bare execution-profile marker
pub fn is_profile_marker(line: &str) -> bool {
    line.trim() == EXECUTION_PROFILE_MARKER
}

/// Node under construction; children are arena indices
#[derive(Debug, Default)]
struct PendingNode {
    name: String,
    count: Option<u64>,
    wall_ms: Option<f64>,
    core_ms: Option<f64>,
    annotations: Vec<String>,
    children: Vec<usize>,
    depth: usize,
}

/// Build the call tree of the first execution-profile block in a group
///
/// Returns `None` when the group has no marker or the block has no node lines.
pub fn build_tree(lines: &[String]) -> Option<ProfileNode> {
    let block = profile_block(lines)?;

    let mut arena: Vec<PendingNode> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut root: Option<usize> = None;

    for raw in block {
        if let Some(caps) = ANNOTATION_LINE.captures(raw) {
            let depth = indent_width(&caps[1]);
            let text = caps[2].to_string();
            if let Some(&owner) = stack.iter().rev().find(|&&idx| arena[idx].depth <= depth) {
                arena[owner].annotations.push(text);
            }
            continue;
        }

        let Some(caps) = NODE_LINE.captures(raw) else {
            continue;
        };
        let mut node = parse_columns(&caps[2]);
        node.depth = indent_width(&caps[1]);

        while stack.last().is_some_and(|&top| arena[top].depth >= node.depth) {
            stack.pop();
        }

        let idx = arena.len();
        match stack.last() {
            Some(&parent) => arena[parent].children.push(idx),
            None => {
                if root.is_some() {
                    debug!("Second top-level node '{}' replaces the profile root", node.name);
                }
                root = Some(idx);
            }
        }
        arena.push(node);
        stack.push(idx);
    }

    root.map(|idx| finalize(idx, &mut arena))
}

/// Lines between the marker and the end of the block, blank lines removed
fn profile_block(lines: &[String]) -> Option<Vec<&str>> {
    let start = lines.iter().position(|line| is_profile_marker(line))?;

    let mut block = Vec::new();
    for line in &lines[start + 1..] {
        if line.trim().is_empty() {
            continue;
        }
        if starts_with_timestamp(line) {
            break;
        }
        if BLOCK_LINE.is_match(line) {
            block.push(line.as_str());
        } else if line.starts_with(END_RESPONSE_MARKER) {
            break;
        }
    }

    if block.is_empty() {
        None
    } else {
        Some(block)
    }
}

/// Split `name  count  wall / core` into a node
fn parse_columns(content: &str) -> PendingNode {
    let parts: Vec<&str> = COLUMN_SEPARATOR
        .split(content)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut node = PendingNode {
        name: parts.first().copied().unwrap_or_default().to_string(),
        ..PendingNode::default()
    };

    if let Some(count) = parts.get(1).and_then(|p| leading_integer(p)) {
        node.count = Some(count);
    }

    if let Some(timing) = parts.get(2) {
        if let Some(dual) = DUAL_TIMING.captures(timing) {
            node.wall_ms = seconds_to_ms(&dual[1]);
            node.core_ms = seconds_to_ms(&dual[2]);
        } else if let Some(single) = SINGLE_TIMING.find(timing) {
            node.wall_ms = seconds_to_ms(single.as_str());
        }
    }

    // Wall and core sometimes land in separate columns
    if parts.len() >= 4 && node.wall_ms.is_none() {
        node.wall_ms = SINGLE_TIMING
            .find(parts[2])
            .and_then(|m| seconds_to_ms(m.as_str()));
        node.core_ms = SINGLE_TIMING
            .find(parts[3])
            .and_then(|m| seconds_to_ms(m.as_str()));
    }

    node
}

fn leading_integer(text: &str) -> Option<u64> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

fn seconds_to_ms(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().map(|secs| secs * 1000.0)
}

/// Bottom-up pass: children are finalized first so self time can subtract them
fn finalize(idx: usize, arena: &mut [PendingNode]) -> ProfileNode {
    let child_ids = std::mem::take(&mut arena[idx].children);
    let children: Vec<ProfileNode> = child_ids
        .into_iter()
        .map(|child| finalize(child, arena))
        .collect();

    let children_wall: f64 = children.iter().map(|c| c.wall_ms.unwrap_or(0.0)).sum();
    let pending = &mut arena[idx];

    ProfileNode {
        name: std::mem::take(&mut pending.name),
        count: pending.count,
        wall_ms: pending.wall_ms,
        core_ms: pending.core_ms,
        self_wall_ms: pending.wall_ms.unwrap_or(0.0) - children_wall,
        annotations: std::mem::take(&mut pending.annotations),
        children,
        depth: pending.depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_root_with_child() {
        let tree = build_tree(&lines(&[
            "[2024-01-01 10:00:00.000 +00:00] [Info] profile",
            "Execution profile:",
            "- Root\t1\t0.100 / 0.020",
            "  - Child\t1\t0.030 / 0.010",
        ]))
        .unwrap();

        assert_eq!(tree.name, "Root");
        assert!(approx(tree.wall_ms.unwrap(), 100.0));
        assert!(approx(tree.core_ms.unwrap(), 20.0));
        assert!(approx(tree.self_wall_ms, 70.0));
        assert_eq!(tree.children.len(), 1);
        assert!(approx(tree.children[0].wall_ms.unwrap(), 30.0));
        assert!(approx(tree.children[0].self_wall_ms, 30.0));
        assert_eq!(tree.children[0].depth, 2);
    }

    #[test]
    fn test_no_marker_no_tree() {
        assert!(build_tree(&lines(&["- Root\t1\t0.100"])).is_none());
    }

    #[test]
    fn test_marker_without_nodes() {
        assert!(build_tree(&lines(&["Execution profile:", "", "End Http Response"])).is_none());
    }

    #[test]
    fn test_block_stops_at_end_marker_and_timestamp() {
        let tree = build_tree(&lines(&[
            "Execution profile:",
            "- Root\t1\t0.100",
            "End Http Response",
            "  - Stray\t1\t0.050",
        ]))
        .unwrap();
        assert!(tree.children.is_empty());

        let tree = build_tree(&lines(&[
            "Execution profile:",
            "- Root\t1\t0.100",
            "[2024-01-01 10:00:01.000 +00:00] next entry",
            "  - Stray\t1\t0.050",
        ]))
        .unwrap();
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_siblings_and_self_time_law() {
        let tree = build_tree(&lines(&[
            "Execution profile:",
            "- Root\t1\t1.000 / 0.100",
            "  - A\t2\t0.400 / 0.050",
            "    - A1\t1\t0.100",
            "  - B\t1\t0.300",
        ]))
        .unwrap();

        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].count, Some(2));
        assert_eq!(tree.children[0].children[0].name, "A1");
        assert!(approx(tree.self_wall_ms, 300.0));
        assert!(approx(tree.children[0].self_wall_ms, 300.0));
        assert!(approx(tree.subtree_self_wall_ms(), tree.wall_ms.unwrap()));
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_annotation_attaches_to_shallower_ancestor() {
        let tree = build_tree(&lines(&[
            "Execution profile:",
            "- Root\t1\t0.500",
            "    - Deep\t1\t0.200",
            "  > logged at root indent",
            "      > logged under deep",
        ]))
        .unwrap();

        assert_eq!(tree.annotations, vec!["logged at root indent"]);
        assert_eq!(tree.children[0].annotations, vec!["logged under deep"]);
    }

    #[test]
    fn test_tabs_and_spaces_normalize() {
        assert_eq!(indent_width("\t"), 4);
        assert_eq!(indent_width("  \t"), 4);
        assert_eq!(indent_width("\t  "), 6);

        let tree = build_tree(&lines(&[
            "Execution profile:",
            "- Root\t1\t0.500",
            "\t- TabChild\t1\t0.100",
            "    - SpaceSibling\t1\t0.100",
        ]))
        .unwrap();
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn test_timing_in_separate_columns() {
        let tree = build_tree(&lines(&[
            "Execution profile:",
            "- Root\t1\tabc\t0.006",
        ]))
        .unwrap();
        assert!(tree.wall_ms.is_none());

        let tree = build_tree(&lines(&[
            "Execution profile:",
            "- Root\t1\twall=0.042s\tcore=0.006s",
        ]))
        .unwrap();
        // single decimal in column 3 sets wall, so column 4 is ignored
        assert!(approx(tree.wall_ms.unwrap(), 42.0));
        assert!(tree.core_ms.is_none());
    }

    #[test]
    fn test_multi_space_columns_and_malformed_timing() {
        let tree = build_tree(&lines(&[
            "Execution profile:",
            "- Root   4   n/a",
        ]))
        .unwrap();
        assert_eq!(tree.name, "Root");
        assert_eq!(tree.count, Some(4));
        assert!(tree.wall_ms.is_none());
        assert_eq!(tree.self_wall_ms, 0.0);
    }
}
