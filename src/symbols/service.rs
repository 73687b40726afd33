//! The symbol service seam and its scoped cache-only override.

use crate::trace::{ModuleFile, TraceLog};
use crate::utils::error::SymbolError;
use log::debug;
use std::ops::{Deref, DerefMut};

/// Loads symbols for module files into a trace's symbol table
pub trait SymbolService {
    /// Whether lookups are restricted to the local cache
    fn cache_only(&self) -> bool;

    fn set_cache_only(&mut self, cache_only: bool);

    /// Resolve as many symbols of `module` as possible into `trace`
    ///
    /// Returns the number of symbols added. Finding nothing is not an error.
    fn lookup_symbols_for_module(
        &mut self,
        trace: &TraceLog,
        module: &ModuleFile,
    ) -> Result<usize, SymbolError>;
}

/// Forces a symbol service into cache-only mode while alive
///
/// The previous mode is restored on drop, including when the lookup done
/// through the guard fails or panics.
pub struct CacheOnlyGuard<'a, S: SymbolService + ?Sized> {
    service: &'a mut S,
    prior: bool,
}

impl<'a, S: SymbolService + ?Sized> CacheOnlyGuard<'a, S> {
    pub fn acquire(service: &'a mut S) -> Self {
        let prior = service.cache_only();
        service.set_cache_only(true);
        debug!("Symbol service switched to cache-only (was {})", prior);
        Self { service, prior }
    }

    /// Mode the service will return to
    pub fn prior(&self) -> bool {
        self.prior
    }
}

impl<S: SymbolService + ?Sized> Deref for CacheOnlyGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.service
    }
}

impl<S: SymbolService + ?Sized> DerefMut for CacheOnlyGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.service
    }
}

impl<S: SymbolService + ?Sized> Drop for CacheOnlyGuard<'_, S> {
    fn drop(&mut self) {
        self.service.set_cache_only(self.prior);
    }
}
