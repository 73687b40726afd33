#![allow(dead_code)]

use callstack_view::stacks::{Frame, RawSample, RawStackSource, StackSource};
use callstack_view::symbols::SymbolService;
use callstack_view::trace::{ModuleFile, SymbolEntry, TraceLog};
use callstack_view::utils::error::SymbolError;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub const CLR_V4: &str = r"C:\Windows\Microsoft.NET\Framework\v4.0\clr.dll";
pub const CLR_V2: &str = r"C:\Windows\Microsoft.NET\Framework\v2.0\clr.dll";
pub const MSCORLIB_NI: &str = r"C:\Windows\assembly\NativeImages\mscorlib.ni.dll";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two processes; pid 1 loads clr v4 and mscorlib.ni, pid 2 loads clr v2
///
/// Resulting tree (no process scope, no symbols):
/// app!Main 21 -> clr!? 16 (excl), mscorlib.ni!? 3 (excl), app!Helper 2 (excl)
/// worker!Run 4 -> clr!? 4 (excl)
pub fn trace_and_source() -> (Rc<TraceLog>, RawStackSource) {
    let mut trace = TraceLog::new();
    trace.add_process(
        1,
        "app.exe",
        &[
            ModuleFile::new(r"C:\app\app.exe"),
            ModuleFile::new(CLR_V4),
            ModuleFile::new(MSCORLIB_NI),
        ],
    );
    trace.add_process(2, "worker.exe", &[ModuleFile::new(CLR_V2)]);
    let trace = Rc::new(trace);

    let samples = vec![
        RawSample::new(1, 10.0, vec![Frame::named("app!Main"), Frame::code("clr", 0x100)]),
        RawSample::new(1, 6.0, vec![Frame::named("app!Main"), Frame::code("clr", 0x200)]),
        RawSample::new(
            1,
            3.0,
            vec![Frame::named("app!Main"), Frame::code("mscorlib.ni", 0x10)],
        ),
        RawSample::new(1, 2.0, vec![Frame::named("app!Main"), Frame::named("app!Helper")]),
        RawSample::new(2, 4.0, vec![Frame::named("worker!Run"), Frame::code("clr", 0x100)]),
    ];

    let source = RawStackSource::with_samples(Rc::clone(&trace), samples);
    (trace, source)
}

pub fn raw_source() -> StackSource {
    trace_and_source().1.into()
}

/// One call made to the recording symbol service
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub module: String,
    pub file_path: String,
    pub cache_only: bool,
}

#[derive(Debug, Default)]
pub struct ServiceState {
    pub cache_only: bool,
    pub lookups: Vec<Lookup>,
    pub symbols: HashMap<String, Vec<SymbolEntry>>,
    pub failing: HashSet<String>,
    pub failing_files: HashSet<String>,
}

/// Symbol service that records every lookup and serves canned symbols
#[derive(Clone, Default)]
pub struct RecordingSymbolService {
    pub state: Rc<RefCell<ServiceState>>,
}

impl RecordingSymbolService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbols(self, module: &str, entries: Vec<SymbolEntry>) -> Self {
        self.state
            .borrow_mut()
            .symbols
            .insert(module.to_lowercase(), entries);
        self
    }

    pub fn failing_for(self, module: &str) -> Self {
        self.state.borrow_mut().failing.insert(module.to_lowercase());
        self
    }

    pub fn failing_for_file(self, file_path: &str) -> Self {
        self.state
            .borrow_mut()
            .failing_files
            .insert(file_path.to_string());
        self
    }

    pub fn lookups(&self) -> Vec<Lookup> {
        self.state.borrow().lookups.clone()
    }

    pub fn is_cache_only(&self) -> bool {
        self.state.borrow().cache_only
    }
}

impl SymbolService for RecordingSymbolService {
    fn cache_only(&self) -> bool {
        self.state.borrow().cache_only
    }

    fn set_cache_only(&mut self, cache_only: bool) {
        self.state.borrow_mut().cache_only = cache_only;
    }

    fn lookup_symbols_for_module(
        &mut self,
        trace: &TraceLog,
        module: &ModuleFile,
    ) -> Result<usize, SymbolError> {
        let mut state = self.state.borrow_mut();
        let cache_only = state.cache_only;
        state.lookups.push(Lookup {
            module: module.name.clone(),
            file_path: module.file_path.display().to_string(),
            cache_only,
        });

        let key = module.name.to_lowercase();
        let file_path = module.file_path.display().to_string();
        if state.failing.contains(&key) || state.failing_files.contains(&file_path) {
            return Err(SymbolError::Unavailable(module.name.clone()));
        }

        let entries = state.symbols.get(&key).cloned().unwrap_or_default();
        Ok(trace.add_symbols(&module.name, entries))
    }
}

pub fn clr_symbols() -> Vec<SymbolEntry> {
    vec![
        SymbolEntry::new(0x100, 0x10, "GCHeap::Alloc"),
        SymbolEntry::new(0x200, 0x10, "JIT_New"),
    ]
}
