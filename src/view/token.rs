//! `module!symbol` tokens naming a frame.

use crate::utils::config::{MODULE_SEPARATOR, UNRESOLVED_SYMBOL};
use std::fmt;

/// Symbol half of a token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolPart {
    Resolved(String),
    /// The `?` placeholder for addresses without symbols
    Unresolved,
}

/// A parsed `module!symbol` token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolToken {
    pub module: String,
    pub symbol: SymbolPart,
}

impl SymbolToken {
    /// Parse a token with exactly one `!`; anything else is rejected
    pub fn parse(token: &str) -> Option<Self> {
        let mut parts = token.split(MODULE_SEPARATOR);
        let (Some(module), Some(symbol), None) = (parts.next(), parts.next(), parts.next()) else {
            return None;
        };

        let symbol = if symbol == UNRESOLVED_SYMBOL {
            SymbolPart::Unresolved
        } else {
            SymbolPart::Resolved(symbol.to_string())
        };

        Some(Self {
            module: module.to_string(),
            symbol,
        })
    }

    pub fn is_unresolved(&self) -> bool {
        self.symbol == SymbolPart::Unresolved
    }

    /// Frame name shared by every unresolved address in this token's module
    pub fn placeholder(&self) -> String {
        format!("{}{}{}", self.module, MODULE_SEPARATOR, UNRESOLVED_SYMBOL)
    }

    /// Whether `name` starts with this token, ignoring case
    pub fn is_prefix_of(&self, name: &str) -> bool {
        name.to_lowercase()
            .starts_with(&self.to_string().to_lowercase())
    }
}

impl fmt::Display for SymbolToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match &self.symbol {
            SymbolPart::Resolved(name) => name.as_str(),
            SymbolPart::Unresolved => UNRESOLVED_SYMBOL,
        };
        write!(f, "{}{}{}", self.module, MODULE_SEPARATOR, symbol)
    }
}
