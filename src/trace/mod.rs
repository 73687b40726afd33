//! Trace metadata: module files, processes and the symbols loaded for them.
//!
//! A `TraceLog` is shared (via `Rc`) between the raw stack source, which
//! names frames through its symbol table, and the view, which asks a symbol
//! service to fill that table on demand.

pub mod symbol_table;

pub use symbol_table::{parse_address, SymbolEntry, SymbolTable};

use log::debug;
use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};

/// Index of a module file inside its `TraceLog`
pub type ModuleFileIndex = usize;

/// A binary image that code addresses in the trace point into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    /// Module name as it appears in frame names (file stem, e.g. "clr")
    pub name: String,

    /// Path of the image on the machine that recorded the trace
    pub file_path: PathBuf,
}

impl ModuleFile {
    /// Create a module file, naming it after the path's file stem
    ///
    /// `C:\Windows\clr.dll` becomes `clr`, `mscorlib.ni.dll` becomes `mscorlib.ni`.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let name = module_name_from_path(&file_path);
        Self { name, file_path }
    }

    /// Case-insensitive comparison against a module name from a frame
    pub fn matches_name(&self, module_name: &str) -> bool {
        self.name.to_lowercase() == module_name.to_lowercase()
    }
}

fn module_name_from_path(path: &Path) -> String {
    // Traces recorded on Windows keep backslash separators
    let raw = path.to_string_lossy();
    let file_name = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(&raw);
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name[..dot].to_string(),
        _ => file_name.to_string(),
    }
}

/// A process seen in the trace and the module files it loaded
#[derive(Debug, Clone)]
pub struct TraceProcess {
    pub process_id: u32,
    pub name: String,
    pub loaded_modules: Vec<ModuleFileIndex>,
}

impl TraceProcess {
    pub fn new(process_id: u32, name: impl Into<String>) -> Self {
        Self {
            process_id,
            name: name.into(),
            loaded_modules: Vec::new(),
        }
    }
}

/// Metadata store for one trace
#[derive(Debug, Default)]
pub struct TraceLog {
    module_files: Vec<ModuleFile>,
    processes: Vec<TraceProcess>,
    symbols: RefCell<SymbolTable>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module file, returning its index
    ///
    /// Registering the same path twice returns the existing index.
    pub fn add_module_file(&mut self, module: ModuleFile) -> ModuleFileIndex {
        if let Some(index) = self
            .module_files
            .iter()
            .position(|m| m.file_path == module.file_path)
        {
            return index;
        }
        self.module_files.push(module);
        self.module_files.len() - 1
    }

    /// Register a process together with the module files it loaded
    pub fn add_process(&mut self, process_id: u32, name: &str, modules: &[ModuleFile]) {
        let mut process = TraceProcess::new(process_id, name);
        for module in modules {
            let index = self.add_module_file(module.clone());
            if !process.loaded_modules.contains(&index) {
                process.loaded_modules.push(index);
            }
        }
        self.processes.push(process);
    }

    /// All module files in the trace, across processes
    pub fn module_files(&self) -> &[ModuleFile] {
        &self.module_files
    }

    pub fn process(&self, process_id: u32) -> Option<&TraceProcess> {
        self.processes.iter().find(|p| p.process_id == process_id)
    }

    pub fn processes(&self) -> &[TraceProcess] {
        &self.processes
    }

    /// Module files loaded by one process
    pub fn loaded_modules<'a>(
        &'a self,
        process: &'a TraceProcess,
    ) -> impl Iterator<Item = &'a ModuleFile> + 'a {
        process
            .loaded_modules
            .iter()
            .filter_map(move |&index| self.module_files.get(index))
    }

    /// Read access to the symbols loaded so far
    pub fn symbols(&self) -> Ref<'_, SymbolTable> {
        self.symbols.borrow()
    }

    /// Record symbols for a module; later frame rendering picks them up
    pub fn add_symbols(
        &self,
        module: &str,
        entries: impl IntoIterator<Item = SymbolEntry>,
    ) -> usize {
        let count = self.symbols.borrow_mut().insert(module, entries);
        debug!("Added {} symbols for module {}", count, module);
        count
    }

    /// Name of the symbol covering `rva` in `module`, if loaded
    pub fn symbol_name(&self, module: &str, rva: u64) -> Option<String> {
        self.symbols
            .borrow()
            .lookup(module, rva)
            .map(|entry| entry.name.clone())
    }
}
