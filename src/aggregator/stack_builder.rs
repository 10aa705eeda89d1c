//! Build collapsed stack format from execution-profile trees.
//!
//! Format: "parent;child;grandchild weight", where weight is the node's
//! self wall time in milliseconds.
//!
//! Example: "EnvController.selectApp;AppService.load 12.500"

use crate::parser::schema::{ProfileNode, ProfileTreeStore};
use log::debug;
use std::collections::HashMap;

/// A single collapsed stack entry
///
/// **Public** - written out for flamegraph tooling
#[derive(Debug, Clone, PartialEq)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string
    pub stack: String,

    /// Self wall time summed over every tree sharing this path (ms)
    pub weight: f64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: f64) -> Self {
        Self { stack, weight }
    }

    /// Render as one collapsed-stack line
    pub fn to_line(&self) -> String {
        format!("{} {:.3}", self.stack, self.weight)
    }
}

/// Build collapsed stacks from every stored tree
///
/// **Public** - main entry point for stack building
///
/// Nodes without positive self time are skipped. Identical paths from
/// different trees are summed. Sorted by weight, heaviest first.
pub fn build_collapsed_stacks(trees: &ProfileTreeStore) -> Vec<CollapsedStack> {
    let mut stack_map: HashMap<String, f64> = HashMap::new();
    let mut path: Vec<String> = Vec::new();

    for (_, root) in trees.iter() {
        collect(root, &mut path, &mut stack_map);
    }

    let mut stacks: Vec<CollapsedStack> = stack_map
        .into_iter()
        .map(|(stack, weight)| CollapsedStack::new(stack, weight))
        .collect();

    stacks.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));

    debug!("Built {} unique collapsed stacks from {} trees", stacks.len(), trees.len());

    stacks
}

fn collect(node: &ProfileNode, path: &mut Vec<String>, stack_map: &mut HashMap<String, f64>) {
    // ';' separates frames
    path.push(node.name.replace(';', ","));

    if node.self_wall_ms > 0.0 {
        *stack_map.entry(path.join(";")).or_insert(0.0) += node.self_wall_ms;
    }
    for child in &node.children {
        collect(child, path, stack_map);
    }

    path.pop();
}

/// Join stacks into collapsed-stack file contents
pub fn stacks_to_text(stacks: &[CollapsedStack]) -> String {
    stacks
        .iter()
        .map(CollapsedStack::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, self_ms: f64, children: Vec<ProfileNode>) -> ProfileNode {
        ProfileNode {
            name: name.to_string(),
            self_wall_ms: self_ms,
            children,
            ..ProfileNode::default()
        }
    }

    #[test]
    fn test_collapsed_stack_to_line() {
        let stack = CollapsedStack::new("a;b".to_string(), 12.5);
        assert_eq!(stack.to_line(), "a;b 12.500");
    }

    #[test]
    fn test_build_collapsed_stacks() {
        let mut store = ProfileTreeStore::new();
        store.insert(
            "r1",
            node("Root", 10.0, vec![node("Child", 30.0, vec![]), node("Idle", 0.0, vec![])]),
        );
        store.insert("r2", node("Root", 5.0, vec![node("Other;Name", 1.0, vec![])]));

        let stacks = build_collapsed_stacks(&store);

        assert_eq!(
            stacks,
            vec![
                CollapsedStack::new("Root;Child".to_string(), 30.0),
                CollapsedStack::new("Root".to_string(), 15.0),
                CollapsedStack::new("Root;Other,Name".to_string(), 1.0),
            ]
        );
        assert_eq!(
            stacks_to_text(&stacks),
            "Root;Child 30.000\nRoot 15.000\nRoot;Other,Name 1.000"
        );
    }

    #[test]
    fn test_empty_store() {
        assert!(build_collapsed_stacks(&ProfileTreeStore::new()).is_empty());
    }
}
