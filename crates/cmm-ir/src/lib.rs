//! Three-address IR generation for cmm programs.
//!
//! This crate lowers the decorated syntax tree produced by the upstream
//! parser and semantic analyzer (`cmm-core`) into linear three-address code
//! suitable for direct interpretation or further backend passes.
//!
//! # Modules
//!
//! - [`ir`] -- The IR data model: variables, labels, operands, instructions
//! - [`emit`] -- The instruction emitter and allocation counters
//! - [`lower`] -- The tree-to-IR translators (the pass itself)
//! - [`error`] -- Error types for every fatal lowering condition
//! - [`text`] -- Canonical text form: printer and inverse parser
//! - [`verify`] -- Structural validation of finished programs

pub mod emit;
pub mod error;
pub mod ir;
pub mod lower;
pub mod text;
pub mod verify;

pub use error::LowerError;
pub use ir::{Instr, IrLabel, IrProgram, IrVar, IrVarInfo, Operand};
pub use lower::lower_program;
pub use text::{parse_program, TextError};
pub use verify::{validate, Finding};
