//! Stable ID newtype for symbols.
//!
//! Symbols live in an arena ([`SymbolTable`](crate::symbol::SymbolTable));
//! the decorated syntax tree refers to them by [`SymbolId`] rather than by
//! shared ownership, so the tree stays a plain value type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable symbol identifier: an index into the program's symbol arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
