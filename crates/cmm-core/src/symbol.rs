//! Symbols and the symbol arena.
//!
//! Name resolution happens upstream; by the time the lowering pass runs,
//! every use site in the tree carries the [`SymbolId`](crate::id::SymbolId)
//! of its declaration. Symbols are immutable here — passes that need to
//! attach per-symbol data (IR variables, function labels) keep their own
//! side tables keyed by id.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::SymbolId;
use crate::type_id::TypeId;

/// A resolved declaration: variable, parameter, or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    /// Source line of the declaration.
    pub line: u32,
    pub ty: TypeId,
}

impl Symbol {
    pub fn new(name: impl Into<String>, line: u32, ty: TypeId) -> Self {
        Symbol {
            name: name.into(),
            line,
            ty,
        }
    }
}

/// Arena of all symbols in a program, indexed by [`SymbolId`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol and returns its id.
    pub fn add(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)
    }

    /// Looks up a symbol, returning [`CoreError::SymbolNotFound`] when absent.
    pub fn resolve(&self, id: SymbolId) -> Result<&Symbol, CoreError> {
        self.get(id).ok_or(CoreError::SymbolNotFound { id })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }
}
