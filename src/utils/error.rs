//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types.
//! `anyhow` only shows up as the payload of user-supplied filter functions,
//! which may fail for reasons this crate knows nothing about.
//!
//! "Not found" is never an error: name lookups fall back to the root node
//! and token lookups return `None`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a filtered stack source
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised by a symbol service while loading a module's symbols
#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Failed to read symbol file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid symbol file {path}: {source}")]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Symbol source unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by `View` operations
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Stack filter failed: {0}")]
    Filter(#[from] anyhow::Error),

    #[error("Symbol lookup failed: {0}")]
    Symbols(#[from] SymbolError),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to read file: {0}")]
    ReadFailed(std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
