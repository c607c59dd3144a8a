//! Lowering error types.
//!
//! The lowering pass assumes a semantically valid tree; everything here is
//! either an unsupported construct or a structural invariant violation.
//! Any error halts the whole translation — there are no recoverable errors
//! in this pass.

use cmm_core::error::CoreError;
use thiserror::Error;

/// Errors produced while lowering a decorated tree to IR.
#[derive(Debug, Error)]
pub enum LowerError {
    /// Global variable declarations are not supported.
    #[error("global variables are not supported (line {line})")]
    GlobalVariable { line: u32 },

    /// Function prototypes without bodies are not supported.
    #[error("function declarations without bodies are not supported (line {line})")]
    FunctionDeclaration { line: u32 },

    /// Float literals are not supported.
    #[error("float literals are not supported (line {line})")]
    FloatLiteral { line: u32 },

    /// Direct struct-to-struct assignment is not supported.
    #[error("struct-valued assignment is not supported (line {line})")]
    StructAssignment { line: u32 },

    /// Member assignment where the member type is an aggregate.
    #[error("assigning an aggregate to a struct member is not supported (line {line})")]
    AggregateMemberAssignment { line: u32 },

    /// An aggregate expression did not yield an address where one was
    /// required (indexing/member base, aggregate copy operand, aggregate
    /// argument).
    #[error("expression does not yield an aggregate address (line {line})")]
    NotAddressable { line: u32 },

    /// The left-hand side of an assignment is not an identifier, index, or
    /// member expression.
    #[error("invalid assignment target (line {line})")]
    InvalidAssignTarget { line: u32 },

    /// A function whose name uses the anonymous-label spelling (`l<n>`),
    /// which would make the printed text form ambiguous.
    #[error("function name '{name}' collides with the anonymous label spelling (line {line})")]
    ReservedLabelName { name: String, line: u32 },

    /// A call site's callee symbol does not have a function type.
    #[error("'{name}' is not a function (line {line})")]
    NotAFunction { name: String, line: u32 },

    /// A call referenced a function whose definition has not been lowered.
    #[error("call to '{name}' before its definition (line {line})")]
    UnresolvedFunction { name: String, line: u32 },

    /// Argument count does not match the callee's parameter list.
    #[error("'{name}' expects {expected} argument(s), found {found} (line {line})")]
    CallArity {
        name: String,
        expected: usize,
        found: usize,
        line: u32,
    },

    /// An identifier was used before the lowering pass saw its declaration.
    #[error("variable '{name}' has no IR slot (line {line})")]
    UnboundVariable { name: String, line: u32 },

    /// Structural failure in the core model (missing type or symbol).
    #[error(transparent)]
    Core(#[from] CoreError),
}
