//! Interactive navigation over a lazily built call tree.
//!
//! A `View` is one analysis session over a stack source. It builds the
//! filtered call tree and its by-name index on first use, keeps them until
//! something invalidates them, and answers name, caller/callee and
//! `module!symbol` queries against them.
//!
//! Views are single-threaded: queries may rebuild the cache and may call
//! into the symbol service, so they all take `&mut self`.

pub mod resolution;
pub mod token;

pub use token::{SymbolPart, SymbolToken};

use crate::aggregator::{AggregateTree, CallTree, NodeStats, ScalingPolicy};
use crate::stacks::{default_filter, unwrap_to_raw, FilterFn, StackSource};
use crate::symbols::SymbolService;
use crate::trace::TraceLog;
use crate::utils::error::ViewError;
use log::debug;
use regex::RegexBuilder;
use std::collections::HashSet;
use std::rc::Rc;

/// One analysis session over a stack source
pub struct View {
    trace: Option<Rc<TraceLog>>,
    source: StackSource,
    process_id: Option<u32>,
    symbol_service: Option<Box<dyn SymbolService>>,
    filter: FilterFn,

    // Derived state; always cleared together
    call_tree: Option<CallTree>,
    by_name: Option<Vec<NodeStats>>,

    /// Modules symbol loading was attempted for, whatever the outcome
    resolved_modules: HashSet<String>,
}

impl View {
    /// Create a view over `source` with the default filter
    ///
    /// The trace behind the source, if any, is found by unwrapping it down
    /// to its raw layer.
    pub fn new(source: StackSource) -> Self {
        let trace = unwrap_to_raw(&source).map(|raw| Rc::clone(raw.trace()));

        Self {
            trace,
            source,
            process_id: None,
            symbol_service: None,
            filter: Box::new(default_filter),
            call_tree: None,
            by_name: None,
            resolved_modules: HashSet::new(),
        }
    }

    pub fn with_trace(mut self, trace: Rc<TraceLog>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Restrict the view to one process
    pub fn with_process(mut self, process_id: u32) -> Self {
        self.process_id = Some(process_id);
        self
    }

    pub fn with_symbol_service(mut self, service: impl SymbolService + 'static) -> Self {
        self.symbol_service = Some(Box::new(service));
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&StackSource, Option<u32>) -> anyhow::Result<StackSource> + 'static,
    {
        self.filter = Box::new(filter);
        self
    }

    /// Replace the filter function; the next query rebuilds the tree
    pub fn set_filter<F>(&mut self, filter: F)
    where
        F: Fn(&StackSource, Option<u32>) -> anyhow::Result<StackSource> + 'static,
    {
        self.filter = Box::new(filter);
        self.invalidate_cached_structures();
    }

    pub fn source(&self) -> &StackSource {
        &self.source
    }

    pub fn trace(&self) -> Option<&Rc<TraceLog>> {
        self.trace.as_ref()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    pub fn resolved_modules(&self) -> &HashSet<String> {
        &self.resolved_modules
    }

    /// Whether a call tree is currently cached
    pub fn is_cached(&self) -> bool {
        self.call_tree.is_some()
    }

    /// The filtered call tree, built on first use and after invalidation
    ///
    /// **Public** - every query goes through this cache
    ///
    /// # Errors
    /// * `ViewError::Filter` - the filter function failed; nothing is cached
    pub fn call_tree(&mut self) -> Result<&CallTree, ViewError> {
        let tree = match self.call_tree.take() {
            Some(tree) => tree,
            None => self.build_call_tree()?,
        };
        Ok(self.call_tree.insert(tree))
    }

    /// Run the filter over the source and aggregate the result
    ///
    /// **Private** - internal helper for call_tree
    fn build_call_tree(&self) -> Result<CallTree, ViewError> {
        debug!(
            "Building call tree from {} source (process {:?})",
            self.source.kind(),
            self.process_id
        );
        // Filter, then aggregate with metrics as sampled
        let filtered = (self.filter)(&self.source, self.process_id)?;
        Ok(CallTree::build(&filtered, ScalingPolicy::ScaleToData))
    }

    /// Nodes of the current tree, one per name, heaviest exclusive cost first
    pub fn nodes_by_exclusive(&mut self) -> Result<&[NodeStats], ViewError> {
        let index = match self.by_name.take() {
            Some(index) => index,
            None => self.call_tree()?.by_name_sorted_exclusive(),
        };
        Ok(self.by_name.insert(index).as_slice())
    }

    /// Drop the cached tree and index; the next query rebuilds both
    pub fn invalidate_cached_structures(&mut self) {
        debug!("Invalidating cached call tree");
        self.call_tree = None;
        self.by_name = None;
    }

    /// First node, in exclusive-cost order, whose name matches `pattern`
    ///
    /// The pattern is a case-insensitive regex searched anywhere in the name.
    /// When nothing matches, the tree root is returned.
    ///
    /// # Arguments
    /// * `pattern` - Regex matched against node names
    ///
    /// # Returns
    /// The heaviest matching node, or the root when none matches
    ///
    /// # Errors
    /// * `ViewError::InvalidPattern` - `pattern` is not a valid regex
    /// * `ViewError::Filter` - the tree had to be rebuilt and the filter failed
    pub fn find_node_by_name(&mut self, pattern: &str) -> Result<NodeStats, ViewError> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;

        // Linear scan in exclusive-cost order
        let found = self
            .nodes_by_exclusive()?
            .iter()
            .find(|node| regex.is_match(&node.name))
            .cloned();

        match found {
            Some(node) => Ok(node),
            None => {
                debug!("No node matches '{}', using root", pattern);
                Ok(self.call_tree()?.root())
            }
        }
    }

    /// Callers of the node `symbol_name` resolves to
    pub fn callers(&mut self, symbol_name: &str) -> Result<AggregateTree, ViewError> {
        let node = self.find_node_by_name(symbol_name)?;
        Ok(self.call_tree()?.callers_of(&node.name))
    }

    /// Callees of the node `symbol_name` resolves to
    pub fn callees(&mut self, symbol_name: &str) -> Result<AggregateTree, ViewError> {
        let node = self.find_node_by_name(symbol_name)?;
        Ok(self.call_tree()?.callees_of(&node.name))
    }
}
