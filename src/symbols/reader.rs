//! File-backed symbol service.
//!
//! Symbols for a module live in `<module>.sym.json`:
//!
//! ```json
//! { "module": "clr", "symbols": [ { "rva": "0x1000", "size": 256, "name": "GCHeap::Alloc" } ] }
//! ```
//!
//! The reader looks in its cache directory first and then, unless it is in
//! cache-only mode, in each search path. Files found on a search path are
//! copied into the cache directory.

use super::service::SymbolService;
use crate::trace::{ModuleFile, SymbolEntry, TraceLog};
use crate::utils::config::{SYMBOL_FILE_EXTENSION, SYMBOL_PATH_ENV, SYMBOL_PATH_SEPARATOR};
use crate::utils::error::SymbolError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Where a `LocalSymbolReader` looks for symbol files
#[derive(Debug, Clone, Default)]
pub struct SymbolReaderConfig {
    /// Local cache, always consulted first
    pub cache_dir: Option<PathBuf>,

    /// Slower locations, consulted in order when not in cache-only mode
    pub search_paths: Vec<PathBuf>,

    pub cache_only: bool,
}

impl SymbolReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }

    pub fn with_cache_only(mut self, cache_only: bool) -> Self {
        self.cache_only = cache_only;
        self
    }

    /// Parse a `;`-separated symbol path; the first entry is the cache
    pub fn from_symbol_path(symbol_path: &str) -> Self {
        let mut entries = symbol_path
            .split(SYMBOL_PATH_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from);

        Self {
            cache_dir: entries.next(),
            search_paths: entries.collect(),
            cache_only: false,
        }
    }

    /// Read the symbol path from `_NT_SYMBOL_PATH`, empty if unset
    pub fn from_env() -> Self {
        match std::env::var(SYMBOL_PATH_ENV) {
            Ok(symbol_path) => {
                debug!("Using symbol path from {}: {}", SYMBOL_PATH_ENV, symbol_path);
                Self::from_symbol_path(&symbol_path)
            }
            Err(_) => Self::default(),
        }
    }
}

/// On-disk symbol file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolFile {
    /// Module the symbols belong to, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    pub symbols: Vec<SymbolEntry>,
}

/// Symbol service reading JSON symbol files from local directories
#[derive(Debug, Clone)]
pub struct LocalSymbolReader {
    config: SymbolReaderConfig,
}

impl LocalSymbolReader {
    pub fn new(config: SymbolReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SymbolReaderConfig {
        &self.config
    }

    pub fn symbol_file_name(module: &ModuleFile) -> String {
        format!("{}.{}", module.name, SYMBOL_FILE_EXTENSION)
    }

    /// Find the symbol file for `module`, honoring cache-only mode
    ///
    /// **Public** - used by the `SymbolService` impl, also handy for diagnostics
    ///
    /// # Arguments
    /// * `module` - Module file whose `<name>.sym.json` is wanted
    ///
    /// # Returns
    /// Path of the first match, cache directory before search paths
    pub fn locate(&self, module: &ModuleFile) -> Option<PathBuf> {
        let file_name = Self::symbol_file_name(module);

        // Check cache
        if let Some(cache_dir) = &self.config.cache_dir {
            let candidate = cache_dir.join(&file_name);
            if candidate.is_file() {
                debug!("Found {} in symbol cache", file_name);
                return Some(candidate);
            }
        }

        if self.config.cache_only {
            debug!("Cache-only mode, not searching for {}", file_name);
            return None;
        }

        // Search paths, in order
        for dir in &self.config.search_paths {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                debug!("Found {} in {}", file_name, dir.display());
                self.populate_cache(&candidate, &file_name);
                return Some(candidate);
            }
        }

        None
    }

    /// Copy a symbol file found on a search path into the cache directory
    ///
    /// **Private** - internal helper for locate; failures only log
    fn populate_cache(&self, found: &Path, file_name: &str) {
        let Some(cache_dir) = &self.config.cache_dir else {
            return;
        };

        let target = cache_dir.join(file_name);
        let copied =
            std::fs::create_dir_all(cache_dir).and_then(|_| std::fs::copy(found, &target));
        match copied {
            Ok(_) => debug!("Cached {} at {}", file_name, target.display()),
            Err(e) => warn!("Failed to cache {}: {}", file_name, e),
        }
    }

    /// Read and parse a symbol file
    ///
    /// # Errors
    /// * `SymbolError::Io` - file cannot be opened
    /// * `SymbolError::InvalidFile` - contents are not a symbol file
    pub fn read_symbol_file(path: &Path) -> Result<SymbolFile, SymbolError> {
        let file = File::open(path).map_err(|source| SymbolError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            SymbolError::InvalidFile {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

impl SymbolService for LocalSymbolReader {
    fn cache_only(&self) -> bool {
        self.config.cache_only
    }

    fn set_cache_only(&mut self, cache_only: bool) {
        self.config.cache_only = cache_only;
    }

    fn lookup_symbols_for_module(
        &mut self,
        trace: &TraceLog,
        module: &ModuleFile,
    ) -> Result<usize, SymbolError> {
        let Some(path) = self.locate(module) else {
            info!(
                "No symbols found for {} ({})",
                module.name,
                module.file_path.display()
            );
            return Ok(0);
        };

        let symbol_file = Self::read_symbol_file(&path)?;
        if let Some(recorded) = &symbol_file.module {
            if !module.matches_name(recorded) {
                warn!(
                    "Symbol file {} is for module {}, loading it for {} anyway",
                    path.display(),
                    recorded,
                    module.name
                );
            }
        }

        let count = trace.add_symbols(&module.name, symbol_file.symbols);
        info!("Loaded {} symbols for {} from {}", count, module.name, path.display());
        Ok(count)
    }
}
