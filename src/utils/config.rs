//! Configuration and constants for the view layer.

/// Separator between module and symbol in a frame name ("clr!GCHeap::Alloc")
pub const MODULE_SEPARATOR: char = '!';

/// Symbol text used for code addresses whose symbols are not loaded yet
pub const UNRESOLVED_SYMBOL: &str = "?";

/// Name suffix of precompiled (native image) modules.
/// These only ever get symbols from the local cache.
pub const PRECOMPILED_IMAGE_SUFFIX: &str = ".ni";

/// Name of the synthetic node at the top of every call tree
pub const ROOT_NODE_NAME: &str = "ROOT";

/// Upper bound on wrapper layers walked when looking for the raw source
pub const MAX_UNWRAP_DEPTH: usize = 64;

/// Extension appended to a module name to form its symbol file name
pub const SYMBOL_FILE_EXTENSION: &str = "sym.json";

/// Environment variable holding the symbol search path
pub const SYMBOL_PATH_ENV: &str = "_NT_SYMBOL_PATH";

// Entries in the symbol path are separated like the Windows symbol path
pub const SYMBOL_PATH_SEPARATOR: char = ';';
