//! Aggregate resolved stack samples into a call tree.
//!
//! Every sample is inserted from its outermost frame down to the leaf.
//! Each node on the path gets the sample's metric as inclusive cost and the
//! leaf also gets it as exclusive cost.
//!
//! Example: samples "main;parse 5" and "main;render 3" give
//! ROOT(8) -> main(8) -> { parse(5, excl 5), render(3, excl 3) }

use super::aggregate::{percent_of, AggregateBuilder, AggregateKind, AggregateTree};
use crate::stacks::{StackSample, StackSource};
use crate::utils::config::ROOT_NODE_NAME;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a node inside a `CallTree`
pub type NodeId = usize;

const ROOT_ID: NodeId = 0;

/// How sample metrics are scaled while building the tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalingPolicy {
    /// Keep metrics as sampled; percentages are relative to the observed total
    ScaleToData,

    /// Multiply every sample metric by a fixed factor
    Factor(f64),
}

impl ScalingPolicy {
    fn apply(&self, metric: f64) -> f64 {
        match self {
            ScalingPolicy::ScaleToData => metric,
            ScalingPolicy::Factor(factor) => metric * factor,
        }
    }
}

/// Metrics for a node, or for all nodes sharing a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub name: String,
    pub inclusive: f64,
    pub exclusive: f64,

    /// Inclusive metric as a percentage of the tree total
    pub inclusive_percent: f64,
}

#[derive(Debug)]
struct TreeNode {
    name: String,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    inclusive: f64,
    exclusive: f64,
}

impl TreeNode {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: HashMap::new(),
            inclusive: 0.0,
            exclusive: 0.0,
        }
    }
}

/// An aggregated call tree with a synthetic `ROOT` node on top
#[derive(Debug)]
pub struct CallTree {
    nodes: Vec<TreeNode>,
    scaling: ScalingPolicy,
}

impl CallTree {
    /// Build a tree from every sample the source yields
    pub fn build(source: &StackSource, scaling: ScalingPolicy) -> Self {
        Self::from_samples(&source.samples(), scaling)
    }

    pub fn from_samples(samples: &[StackSample], scaling: ScalingPolicy) -> Self {
        let mut tree = Self {
            nodes: vec![TreeNode::new(ROOT_NODE_NAME, None)],
            scaling,
        };

        for sample in samples {
            tree.insert(&sample.frames, scaling.apply(sample.metric));
        }

        debug!(
            "Built call tree: {} samples, {} nodes, total metric {}",
            samples.len(),
            tree.nodes.len(),
            tree.total_metric()
        );

        tree
    }

    fn insert(&mut self, frames: &[String], metric: f64) {
        let mut current = ROOT_ID;
        self.nodes[current].inclusive += metric;

        for frame in frames {
            current = self.child_of(current, frame);
            self.nodes[current].inclusive += metric;
        }

        self.nodes[current].exclusive += metric;
    }

    fn child_of(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(&id) = self.nodes[parent].children.get(name) {
            return id;
        }

        let id = self.nodes.len();
        self.nodes.push(TreeNode::new(name, Some(parent)));
        self.nodes[parent].children.insert(name.to_string(), id);
        id
    }

    pub fn scaling(&self) -> ScalingPolicy {
        self.scaling
    }

    pub fn total_metric(&self) -> f64 {
        self.nodes[ROOT_ID].inclusive
    }

    /// Number of nodes, including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> NodeStats {
        let root = &self.nodes[ROOT_ID];
        self.stats(&root.name, root.inclusive, root.exclusive)
    }

    fn stats(&self, name: &str, inclusive: f64, exclusive: f64) -> NodeStats {
        NodeStats {
            name: name.to_string(),
            inclusive,
            exclusive,
            inclusive_percent: percent_of(inclusive, self.total_metric()),
        }
    }

    /// One entry per distinct frame name, heaviest exclusive cost first
    ///
    /// Exclusive cost is summed over every occurrence of the name. Inclusive
    /// cost only counts occurrences with no same-named ancestor, so recursion
    /// is not counted twice. Ties are broken by name.
    pub fn by_name_sorted_exclusive(&self) -> Vec<NodeStats> {
        let mut totals: HashMap<&str, (f64, f64)> = HashMap::new();
        let mut active: HashMap<&str, usize> = HashMap::new();

        // (node, leaving) pairs; leaving entries pop the name off `active`
        let mut pending: Vec<(NodeId, bool)> = self.nodes[ROOT_ID]
            .children
            .values()
            .map(|&id| (id, false))
            .collect();

        while let Some((id, leaving)) = pending.pop() {
            let node = &self.nodes[id];
            let name = node.name.as_str();

            if leaving {
                if let Some(count) = active.get_mut(name) {
                    *count -= 1;
                }
                continue;
            }

            let entry = totals.entry(name).or_insert((0.0, 0.0));
            entry.1 += node.exclusive;

            let depth = active.entry(name).or_insert(0);
            if *depth == 0 {
                entry.0 += node.inclusive;
            }
            *depth += 1;

            pending.push((id, true));
            pending.extend(node.children.values().map(|&child| (child, false)));
        }

        let mut sorted: Vec<NodeStats> = totals
            .into_iter()
            .map(|(name, (inclusive, exclusive))| self.stats(name, inclusive, exclusive))
            .collect();

        sorted.sort_by(|a, b| {
            b.exclusive
                .total_cmp(&a.exclusive)
                .then_with(|| a.name.cmp(&b.name))
        });

        sorted
    }

    /// Occurrences of `name` that are not nested inside another occurrence
    fn outermost(&self, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut pending = vec![ROOT_ID];

        while let Some(id) = pending.pop() {
            let node = &self.nodes[id];
            if node.name == name {
                found.push(id);
                continue;
            }
            pending.extend(node.children.values().copied());
        }

        found
    }

    /// Everything called from `name`, merged across the tree
    pub fn callees_of(&self, name: &str) -> AggregateTree {
        let mut builder = AggregateBuilder::new(name);
        for id in self.outermost(name) {
            self.merge_callees(&mut builder, id);
        }

        AggregateTree {
            kind: AggregateKind::Callees,
            focus: name.to_string(),
            total_metric: self.total_metric(),
            root: builder.finish(self.total_metric()),
        }
    }

    fn merge_callees(&self, aggregate: &mut AggregateBuilder, id: NodeId) {
        let node = &self.nodes[id];
        aggregate.inclusive += node.inclusive;
        aggregate.exclusive += node.exclusive;

        for &child in node.children.values() {
            let child_name = &self.nodes[child].name;
            self.merge_callees(aggregate.child(child_name), child);
        }
    }

    /// Every call path leading to `name`, merged and inverted
    ///
    /// Caller nodes carry the inclusive cost of `name` reached through them,
    /// up to and including the root.
    pub fn callers_of(&self, name: &str) -> AggregateTree {
        let mut builder = AggregateBuilder::new(name);

        for id in self.outermost(name) {
            let node = &self.nodes[id];
            builder.inclusive += node.inclusive;
            builder.exclusive += node.exclusive;

            let mut aggregate = &mut builder;
            let mut parent = node.parent;
            while let Some(caller) = parent {
                let caller_node = &self.nodes[caller];
                aggregate = aggregate.child(&caller_node.name);
                aggregate.inclusive += node.inclusive;
                parent = caller_node.parent;
            }
        }

        AggregateTree {
            kind: AggregateKind::Callers,
            focus: name.to_string(),
            total_metric: self.total_metric(),
            root: builder.finish(self.total_metric()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> CallTree {
        CallTree::from_samples(
            &[
                StackSample::new(1, 5.0, &["main", "parse", "alloc"]),
                StackSample::new(1, 3.0, &["main", "render"]),
                StackSample::new(1, 2.0, &["main", "render", "alloc"]),
            ],
            ScalingPolicy::ScaleToData,
        )
    }

    #[test]
    fn test_build_metrics() {
        let tree = tree();
        let root = tree.root();

        assert_eq!(root.name, ROOT_NODE_NAME);
        assert_eq!(root.inclusive, 10.0);
        assert_eq!(root.exclusive, 0.0);
        assert_eq!(root.inclusive_percent, 100.0);
        // ROOT, main, parse, alloc, render, alloc
        assert_eq!(tree.node_count(), 6);
    }

    #[test]
    fn test_factor_scaling() {
        let tree = CallTree::from_samples(
            &[StackSample::new(1, 2.0, &["main"])],
            ScalingPolicy::Factor(10.0),
        );
        assert_eq!(tree.total_metric(), 20.0);
        assert_eq!(tree.scaling(), ScalingPolicy::Factor(10.0));
    }

    #[test]
    fn test_by_name_sorted_exclusive() {
        let sorted = tree().by_name_sorted_exclusive();
        let names: Vec<_> = sorted.iter().map(|n| n.name.as_str()).collect();

        assert_eq!(names, vec!["alloc", "render", "main", "parse"]);
        assert_eq!(sorted[0].exclusive, 7.0);
        assert_eq!(sorted[0].inclusive, 7.0);
        assert_eq!(sorted[1].inclusive, 5.0);
        assert_eq!(sorted[2].inclusive, 10.0);
    }

    #[test]
    fn test_recursion_not_double_counted() {
        let tree = CallTree::from_samples(
            &[StackSample::new(1, 4.0, &["walk", "walk", "walk"])],
            ScalingPolicy::ScaleToData,
        );
        let walk = &tree.by_name_sorted_exclusive()[0];

        assert_eq!(walk.inclusive, 4.0);
        assert_eq!(walk.exclusive, 4.0);
    }

    #[test]
    fn test_callees_merge_occurrences() {
        let callees = tree().callees_of("alloc");
        assert_eq!(callees.kind, AggregateKind::Callees);
        assert_eq!(callees.root.inclusive, 7.0);
        assert!(callees.root.children.is_empty());

        let main = tree().callees_of("main");
        assert_eq!(main.root.children[0].name, "parse");
        assert_eq!(main.root.find_path(&["render", "alloc"]).unwrap().inclusive, 2.0);
    }

    #[test]
    fn test_callers_invert_paths() {
        let callers = tree().callers_of("alloc");

        assert_eq!(callers.kind, AggregateKind::Callers);
        assert_eq!(callers.root.inclusive, 7.0);
        assert_eq!(callers.root.child("parse").unwrap().inclusive, 5.0);
        assert_eq!(callers.root.child("render").unwrap().inclusive, 2.0);
        assert_eq!(
            callers
                .root
                .find_path(&["parse", "main", ROOT_NODE_NAME])
                .unwrap()
                .inclusive,
            5.0
        );
    }

    #[test]
    fn test_root_projections() {
        let tree = tree();

        let callers = tree.callers_of(ROOT_NODE_NAME);
        assert_eq!(callers.root.inclusive, 10.0);
        assert!(callers.root.children.is_empty());

        let callees = tree.callees_of(ROOT_NODE_NAME);
        assert_eq!(callees.root.node_count(), tree.node_count());
    }

    #[test]
    fn test_empty_tree() {
        let tree = CallTree::from_samples(&[], ScalingPolicy::ScaleToData);
        assert_eq!(tree.total_metric(), 0.0);
        assert!(tree.by_name_sorted_exclusive().is_empty());
        assert_eq!(tree.root().inclusive_percent, 0.0);
    }
}
