mod common;

use callstack_view::symbols::{LocalSymbolReader, SymbolReaderConfig, SymbolService};
use callstack_view::trace::{ModuleFile, TraceLog};
use callstack_view::utils::error::SymbolError;
use callstack_view::View;
use common::{init_logging, raw_source};
use serde_json::json;
use std::fs;
use std::path::Path;

fn write_symbols(dir: &Path, module: &str, symbols: serde_json::Value) {
    fs::create_dir_all(dir).unwrap();
    let body = json!({ "module": module, "symbols": symbols });
    fs::write(dir.join(format!("{}.sym.json", module)), body.to_string()).unwrap();
}

#[test]
fn test_reader_loads_from_search_path_and_populates_cache() {
    init_logging();
    let temp = tempfile::tempdir().unwrap();
    let cache = temp.path().join("cache");
    let server = temp.path().join("server");
    write_symbols(&server, "clr", json!([{ "rva": "0x100", "size": 16, "name": "GCHeap::Alloc" }]));

    let mut reader = LocalSymbolReader::new(
        SymbolReaderConfig::new()
            .with_cache_dir(&cache)
            .with_search_path(&server),
    );
    let trace = TraceLog::new();
    let module = ModuleFile::new("clr.dll");

    assert_eq!(reader.lookup_symbols_for_module(&trace, &module).unwrap(), 1);
    assert_eq!(trace.symbol_name("clr", 0x108).as_deref(), Some("GCHeap::Alloc"));
    assert!(cache.join("clr.sym.json").is_file());
}

#[test]
fn test_cache_only_reader_skips_search_path() {
    let temp = tempfile::tempdir().unwrap();
    let server = temp.path().join("server");
    write_symbols(&server, "clr", json!([{ "rva": 256, "name": "GCHeap::Alloc" }]));

    let mut reader = LocalSymbolReader::new(
        SymbolReaderConfig::new()
            .with_cache_dir(temp.path().join("cache"))
            .with_search_path(&server)
            .with_cache_only(true),
    );
    let trace = TraceLog::new();

    assert_eq!(
        reader
            .lookup_symbols_for_module(&trace, &ModuleFile::new("clr.dll"))
            .unwrap(),
        0
    );
    assert!(trace.symbols().is_empty());
}

#[test]
fn test_missing_symbols_are_not_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let mut reader =
        LocalSymbolReader::new(SymbolReaderConfig::new().with_search_path(temp.path()));

    let loaded = reader
        .lookup_symbols_for_module(&TraceLog::new(), &ModuleFile::new("ntdll.dll"))
        .unwrap();
    assert_eq!(loaded, 0);
}

#[test]
fn test_corrupt_symbol_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("clr.sym.json"), "{ not json").unwrap();
    let mut reader = LocalSymbolReader::new(SymbolReaderConfig::new().with_cache_dir(temp.path()));

    let err = reader
        .lookup_symbols_for_module(&TraceLog::new(), &ModuleFile::new("clr.dll"))
        .unwrap_err();
    assert!(matches!(err, SymbolError::InvalidFile { .. }));
}

#[test]
fn test_bad_address_in_symbol_file() {
    let temp = tempfile::tempdir().unwrap();
    write_symbols(temp.path(), "clr", json!([{ "rva": "0xnope", "name": "f" }]));
    let mut reader = LocalSymbolReader::new(SymbolReaderConfig::new().with_cache_dir(temp.path()));

    assert!(reader
        .lookup_symbols_for_module(&TraceLog::new(), &ModuleFile::new("clr.dll"))
        .is_err());
}

#[test]
fn test_view_resolves_through_local_reader() {
    init_logging();
    let temp = tempfile::tempdir().unwrap();
    let server = temp.path().join("server");
    write_symbols(
        &server,
        "clr",
        json!([
            { "rva": "0x100", "size": "0x10", "name": "GCHeap::Alloc" },
            { "rva": "0x200", "size": "0x10", "name": "JIT_New" }
        ]),
    );

    let reader = LocalSymbolReader::new(
        SymbolReaderConfig::new()
            .with_cache_dir(temp.path().join("cache"))
            .with_search_path(&server),
    );
    let mut view = View::new(raw_source()).with_symbol_service(reader);

    let node = view.call_tree_node("clr!JIT_New").unwrap().unwrap();
    assert_eq!(node.exclusive, 6.0);

    let callers = view.callers("clr!GCHeap::Alloc").unwrap();
    let names: Vec<_> = callers.root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["app!Main", "worker!Run"]);
}

#[test]
fn test_precompiled_image_only_uses_cache() {
    init_logging();
    let temp = tempfile::tempdir().unwrap();
    let server = temp.path().join("server");
    write_symbols(
        &server,
        "mscorlib.ni",
        json!([{ "rva": 0, "size": 64, "name": "String.Concat" }]),
    );

    let reader = LocalSymbolReader::new(
        SymbolReaderConfig::new()
            .with_cache_dir(temp.path().join("cache"))
            .with_search_path(&server),
    );
    let mut view = View::new(raw_source()).with_symbol_service(reader);

    // Only on the search path, which precompiled images never consult
    assert!(view
        .call_tree_node("mscorlib.ni!String.Concat")
        .unwrap()
        .is_none());
    assert!(view.resolved_modules().contains("mscorlib.ni"));
    assert!(!temp.path().join("cache/mscorlib.ni.sym.json").exists());
}

#[test]
fn test_precompiled_image_found_in_cache() {
    let temp = tempfile::tempdir().unwrap();
    let cache = temp.path().join("cache");
    write_symbols(
        &cache,
        "mscorlib.ni",
        json!([{ "rva": 0, "size": 64, "name": "String.Concat" }]),
    );

    let reader = LocalSymbolReader::new(SymbolReaderConfig::new().with_cache_dir(&cache));
    let mut view = View::new(raw_source()).with_symbol_service(reader);

    let node = view.call_tree_node("mscorlib.ni!String.Concat").unwrap().unwrap();
    assert_eq!(node.exclusive, 3.0);
}
