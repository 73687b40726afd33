//! Aggregation of stack samples into call trees.
//!
//! This module turns resolved stack samples into:
//! - A call tree with inclusive/exclusive metrics per node
//! - A by-name index sorted by exclusive cost
//! - Caller- and callee-rooted aggregate trees

pub mod aggregate;
pub mod call_tree;

// Re-export main types
pub use aggregate::{AggregateKind, AggregateNode, AggregateTree};
pub use call_tree::{CallTree, NodeId, NodeStats, ScalingPolicy};
