//! JSON export of caller/callee aggregate trees.

use crate::aggregator::AggregateTree;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Write an aggregate tree to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// let callers = view.callers("clr!GCHeap::Alloc")?;
/// write_tree(&callers, "alloc-callers.json")?;
/// ```
pub fn write_tree(tree: &AggregateTree, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!(
        "Writing {:?} of {} to: {}",
        tree.kind,
        tree.focus,
        output_path.display()
    );

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    serde_json::to_writer_pretty(BufWriter::new(file), tree)
        .map_err(OutputError::SerializationFailed)?;

    Ok(())
}

/// Serialize an aggregate tree to a pretty JSON string
pub fn tree_to_string(tree: &AggregateTree) -> Result<String, OutputError> {
    serde_json::to_string_pretty(tree).map_err(OutputError::SerializationFailed)
}

/// Read an aggregate tree back from a JSON file
///
/// # Errors
/// * `OutputError::ReadFailed` - file cannot be opened
/// * `OutputError::SerializationFailed` - contents are not an aggregate tree
pub fn read_tree(input_path: impl AsRef<Path>) -> Result<AggregateTree, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading aggregate tree from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::ReadFailed)?;
    serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)
}

fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}
