//! Core error types for cmm-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the type registry and symbol arena.

use crate::id::SymbolId;
use crate::type_id::TypeId;
use thiserror::Error;

/// Core errors produced by the cmm-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Attempting to register a type name that already exists in the registry.
    #[error("duplicate type name: '{name}'")]
    DuplicateTypeName { name: String },

    /// A TypeId was not found in the type registry.
    #[error("type not found: TypeId({id})", id = id.0)]
    TypeNotFound { id: TypeId },

    /// A SymbolId was not found in the symbol arena.
    #[error("symbol not found: SymbolId({id})", id = id.0)]
    SymbolNotFound { id: SymbolId },

    /// A member offset was requested on a non-struct type.
    #[error("not a struct type: TypeId({id})", id = id.0)]
    NotAStruct { id: TypeId },

    /// A struct has no field with the given name.
    #[error("no field named '{field}'")]
    FieldNotFound { field: String },
}
