//! Caller- and callee-rooted aggregate trees.
//!
//! An aggregate merges every place a function appears in the call tree into
//! one tree rooted at that function: either everything it calls (callees)
//! or every path that leads to it (callers).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which direction an aggregate tree expands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Callers,
    Callees,
}

/// A node of an aggregate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateNode {
    pub name: String,
    pub inclusive: f64,
    pub exclusive: f64,

    /// Inclusive metric as a percentage of the whole call tree
    pub inclusive_percent: f64,

    /// Ordered by inclusive metric, heaviest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AggregateNode>,
}

impl AggregateNode {
    pub fn child(&self, name: &str) -> Option<&AggregateNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follow a path of child names starting below this node
    pub fn find_path(&self, path: &[&str]) -> Option<&AggregateNode> {
        path.iter()
            .try_fold(self, |node, name| node.child(name))
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(AggregateNode::node_count).sum::<usize>()
    }
}

/// Result of a caller or callee projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTree {
    pub kind: AggregateKind,

    /// Name of the node the projection is anchored at
    pub focus: String,

    /// Total metric of the call tree the aggregate was taken from
    pub total_metric: f64,

    pub root: AggregateNode,
}

/// Mutable accumulator used while merging tree occurrences
#[derive(Debug)]
pub(crate) struct AggregateBuilder {
    name: String,
    pub(crate) inclusive: f64,
    pub(crate) exclusive: f64,
    children: HashMap<String, AggregateBuilder>,
}

impl AggregateBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inclusive: 0.0,
            exclusive: 0.0,
            children: HashMap::new(),
        }
    }

    pub(crate) fn child(&mut self, name: &str) -> &mut AggregateBuilder {
        self.children
            .entry(name.to_string())
            .or_insert_with(|| AggregateBuilder::new(name))
    }

    pub(crate) fn finish(self, total: f64) -> AggregateNode {
        let mut children: Vec<AggregateNode> = self
            .children
            .into_values()
            .map(|child| child.finish(total))
            .collect();

        children.sort_by(|a, b| {
            b.inclusive
                .total_cmp(&a.inclusive)
                .then_with(|| a.name.cmp(&b.name))
        });

        AggregateNode {
            name: self.name,
            inclusive: self.inclusive,
            exclusive: self.exclusive,
            inclusive_percent: percent_of(self.inclusive, total),
            children,
        }
    }
}

pub(crate) fn percent_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        (value / total) * 100.0
    } else {
        0.0
    }
}
