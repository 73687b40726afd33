//! Stack sources, filtering and unwrapping.
//!
//! This module handles:
//! - Raw address-level samples and their symbolized rendering
//! - Wrapper sources (copies and filtered views)
//! - The default filter applied before aggregation
//! - Locating the raw source behind a chain of wrappers

pub mod filter;
pub mod source;
pub mod unwrap;

// Re-export main types
pub use filter::{default_filter, filter_with, FilterFn, FilterParams, FilteredStackSource};
pub use source::{CopyStackSource, Frame, RawSample, RawStackSource, StackSample, StackSource};
pub use unwrap::unwrap_to_raw;
