//! Callstack View
//!
//! Interactive navigation over call trees aggregated from sampled call
//! stacks, with symbols loaded on demand the first time a `module!symbol`
//! lookup needs them.
//!
//! ## Getting Started
//!
//! ```ignore
//! let mut view = View::new(raw_source.into())
//!     .with_symbol_service(LocalSymbolReader::new(SymbolReaderConfig::from_env()));
//!
//! let hottest = view.find_node_by_name("alloc")?;
//! let callers = view.callers("clr!GCHeap::Alloc")?;
//! let node = view.call_tree_node("clr!GCHeap::Alloc")?;
//! ```

pub mod aggregator;
pub mod output;
pub mod stacks;
pub mod symbols;
pub mod trace;
pub mod utils;
pub mod view;

pub use aggregator::{AggregateTree, CallTree, NodeStats};
pub use stacks::{StackSource, unwrap_to_raw};
pub use symbols::{LocalSymbolReader, SymbolReaderConfig, SymbolService};
pub use trace::{ModuleFile, TraceLog};
pub use utils::error::ViewError;
pub use view::View;
