//! Symbol loading for modules referenced by a trace.
//!
//! - `SymbolService`: the seam the view calls to load a module's symbols
//! - `CacheOnlyGuard`: scoped cache-only override for precompiled images
//! - `LocalSymbolReader`: JSON symbol files from a cache and search paths

pub mod reader;
pub mod service;

pub use reader::{LocalSymbolReader, SymbolFile, SymbolReaderConfig};
pub use service::{CacheOnlyGuard, SymbolService};
