pub mod ast;
pub mod error;
pub mod id;
pub mod ops;
pub mod symbol;
pub mod type_id;
pub mod types;

// Re-export commonly used types
pub use ast::{Block, Expr, ExprKind, ExtDef, FunctionDef, Program, Stmt, VarDef};
pub use error::CoreError;
pub use id::SymbolId;
pub use ops::{ArithOp, CmpOp};
pub use symbol::{Symbol, SymbolTable};
pub use type_id::{TypeId, TypeRegistry};
pub use types::{StructDef, Ty, WORD_SIZE};
