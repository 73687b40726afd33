//! Per-module symbol ranges used to name code addresses.
//!
//! Symbols are stored as `rva..rva+size` ranges keyed by their start address.
//! Module keys are case-insensitive, matching how module files are looked up.

use crate::utils::error::SymbolError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A single symbol inside a module image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    /// Address relative to the module's image base
    #[serde(deserialize_with = "deserialize_address")]
    pub rva: u64,

    /// Size of the symbol in bytes (0 = covers only `rva`)
    #[serde(default, deserialize_with = "deserialize_address")]
    pub size: u64,

    /// Human-readable name, without the module prefix
    pub name: String,
}

impl SymbolEntry {
    pub fn new(rva: u64, size: u64, name: impl Into<String>) -> Self {
        Self {
            rva,
            size,
            name: name.into(),
        }
    }

    fn contains(&self, rva: u64) -> bool {
        if self.size == 0 {
            rva == self.rva
        } else {
            rva >= self.rva && rva - self.rva < self.size
        }
    }
}

/// Symbols loaded so far, grouped by module
#[derive(Debug, Default)]
pub struct SymbolTable {
    modules: HashMap<String, BTreeMap<u64, SymbolEntry>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add symbols for a module, replacing entries with the same start address
    ///
    /// Returns the number of entries inserted.
    pub fn insert(
        &mut self,
        module: &str,
        entries: impl IntoIterator<Item = SymbolEntry>,
    ) -> usize {
        let ranges = self.modules.entry(module_key(module)).or_default();
        let mut count = 0;
        for entry in entries {
            ranges.insert(entry.rva, entry);
            count += 1;
        }
        count
    }

    /// Find the symbol covering `rva` in `module`
    pub fn lookup(&self, module: &str, rva: u64) -> Option<&SymbolEntry> {
        let ranges = self.modules.get(&module_key(module))?;
        ranges
            .range(..=rva)
            .next_back()
            .map(|(_, entry)| entry)
            .filter(|entry| entry.contains(rva))
    }

    /// Whether any symbols were ever loaded for `module`
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains_key(&module_key(module))
    }

    pub fn len(&self) -> usize {
        self.modules.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn module_key(module: &str) -> String {
    module.to_lowercase()
}

/// Parse an address from a hex ("0x1f00") or decimal string
pub fn parse_address(value: &str) -> Result<u64, SymbolError> {
    if let Some(hex_str) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex_str, 16)
            .map_err(|e| SymbolError::InvalidAddress(format!("{}: {}", value, e)))
    } else {
        value
            .parse::<u64>()
            .map_err(|e| SymbolError::InvalidAddress(format!("{}: {}", value, e)))
    }
}

/// Accept addresses written either as JSON numbers or as strings
fn deserialize_address<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Address {
        Number(u64),
        Text(String),
    }

    match Address::deserialize(deserializer)? {
        Address::Number(n) => Ok(n),
        Address::Text(s) => parse_address(&s).map_err(serde::de::Error::custom),
    }
}
