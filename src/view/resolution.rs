//! `module!symbol` lookups with on-demand symbol loading.
//!
//! A lookup first searches the current tree. If the symbol is missing but
//! the module still has unresolved frames (`module!?`), the module's files
//! are handed to the symbol service, the cache is rebuilt and the lookup is
//! retried once. Each module gets at most one loading attempt per view.

use super::token::SymbolToken;
use super::View;
use crate::aggregator::NodeStats;
use crate::symbols::CacheOnlyGuard;
use crate::trace::ModuleFile;
use crate::utils::config::PRECOMPILED_IMAGE_SUFFIX;
use crate::utils::error::ViewError;
use log::{debug, info, warn};

impl View {
    /// Find the node named by a `module!symbol` token
    ///
    /// Returns `Ok(None)` for malformed tokens and for symbols that are not
    /// in the tree even after the module's symbols were loaded. Errors from
    /// the filter or the symbol service propagate. A failed load still
    /// counts as the module's one attempt, and the cache is dropped so that
    /// symbols from files read before the failure show up.
    pub fn call_tree_node(&mut self, token: &str) -> Result<Option<NodeStats>, ViewError> {
        let Some(token) = SymbolToken::parse(token) else {
            debug!("'{}' is not a module!symbol token", token);
            return Ok(None);
        };

        if let Some(node) = self.find_literal(&token)? {
            return Ok(Some(node));
        }

        if !self.can_load_symbols(&token.module) {
            return Ok(None);
        }

        let placeholder = token.placeholder();
        let probe = self.find_node_by_name(&regex::escape(&placeholder))?;
        if probe.name != placeholder {
            debug!(
                "Module {} has no unresolved frames, not loading symbols",
                token.module
            );
            self.resolved_modules.insert(token.module.clone());
            return Ok(None);
        }

        // Files loaded before a failure have already changed the trace
        let loaded = self.load_module_symbols(&token.module);
        self.invalidate_cached_structures();
        self.resolved_modules.insert(token.module.clone());
        loaded?;

        self.find_literal(&token)
    }

    fn find_literal(&mut self, token: &SymbolToken) -> Result<Option<NodeStats>, ViewError> {
        let node = self.find_node_by_name(&regex::escape(&token.to_string()))?;
        Ok(token.is_prefix_of(&node.name).then_some(node))
    }

    fn can_load_symbols(&self, module: &str) -> bool {
        if self.trace.is_none() || self.symbol_service.is_none() {
            debug!("No trace or symbol service, cannot load symbols for {}", module);
            return false;
        }
        !self.resolved_modules.contains(module)
    }

    /// Run the symbol service over every file backing `module_name`
    fn load_module_symbols(&mut self, module_name: &str) -> Result<(), ViewError> {
        let (Some(trace), Some(service)) =
            (self.trace.as_deref(), self.symbol_service.as_deref_mut())
        else {
            return Ok(());
        };

        let files: Vec<&ModuleFile> = match self.process_id {
            Some(process_id) => match trace.process(process_id) {
                Some(process) => trace
                    .loaded_modules(process)
                    .filter(|file| file.matches_name(module_name))
                    .collect(),
                None => {
                    warn!("Process {} is not in the trace", process_id);
                    Vec::new()
                }
            },
            None => trace
                .module_files()
                .iter()
                .filter(|file| file.matches_name(module_name))
                .collect(),
        };

        info!(
            "Loading symbols for {} from {} file(s)",
            module_name,
            files.len()
        );

        for file in files {
            let loaded = if is_precompiled_image(&file.name) {
                let mut guard = CacheOnlyGuard::acquire(&mut *service);
                guard.lookup_symbols_for_module(trace, file)?
            } else {
                service.lookup_symbols_for_module(trace, file)?
            };
            debug!("{}: {} symbols", file.file_path.display(), loaded);
        }

        Ok(())
    }
}

fn is_precompiled_image(module_name: &str) -> bool {
    module_name.to_lowercase().ends_with(PRECOMPILED_IMAGE_SUFFIX)
}
