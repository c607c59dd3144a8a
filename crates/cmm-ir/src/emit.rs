//! The instruction emitter.
//!
//! [`Emitter`] owns the growing instruction buffer, the variable table, and
//! the anonymous-label counter for one translation. Creating an `Emitter` is
//! the `prepare` step: counters start fresh and the `ignore` sentinel is
//! allocated up front as `t1` — expression statements funnel their discarded
//! results into it, so its assignments are valid but semantically dead IR.
//!
//! The `emit_*` methods check destination operand kinds with internal
//! assertions: arithmetic, `Call`, `Dec`, `Param`, and `Read` destinations
//! must be `Var`; assignment left-hand sides must be assignable. A violation
//! is a translator bug, not an input error, and panics.

use cmm_core::ops::{ArithOp, CmpOp};

use crate::ir::{Instr, IrLabel, IrProgram, IrVar, IrVarInfo, Operand};

/// Append-only instruction builder plus variable/label allocation state for
/// a single translation.
#[derive(Debug)]
pub struct Emitter {
    code: Vec<Instr>,
    vars: Vec<IrVarInfo>,
    label_count: u32,
    ignore: IrVar,
}

impl Emitter {
    /// Prepares a fresh emitter: empty stream, counters at zero, and the
    /// `ignore` sentinel allocated as `t1`.
    pub fn new() -> Self {
        let mut emitter = Emitter {
            code: Vec::new(),
            vars: Vec::new(),
            label_count: 0,
            ignore: IrVar(0),
        };
        emitter.ignore = emitter.new_var(false);
        emitter
    }

    /// The sentinel variable receiving discarded expression results.
    pub fn ignore_var(&self) -> IrVar {
        self.ignore
    }

    /// Allocates a fresh variable. `is_ref` is fixed for the variable's
    /// lifetime: `true` means it will hold the address of an aggregate.
    pub fn new_var(&mut self, is_ref: bool) -> IrVar {
        let var = IrVar(self.vars.len() as u32 + 1);
        self.vars.push(IrVarInfo { id: var, is_ref });
        var
    }

    /// Whether `var` was allocated as an aggregate address holder.
    pub fn is_ref(&self, var: IrVar) -> bool {
        let index = var.0.checked_sub(1).expect("variable ids start at 1") as usize;
        self.vars[index].is_ref
    }

    /// Allocates a fresh anonymous label `l<n>`.
    pub fn new_label(&mut self) -> IrLabel {
        self.label_count += 1;
        IrLabel::Anon(self.label_count)
    }

    /// Creates a named label carrying `name` verbatim.
    ///
    /// `name` must not use the anonymous `l<n>` spelling, or the printed
    /// text form would be ambiguous; the lowering pass rejects such
    /// function names before they reach the emitter.
    pub fn new_named_label(&mut self, name: &str) -> IrLabel {
        assert!(
            !IrLabel::is_anon_spelling(name),
            "named label '{name}' collides with the anonymous label spelling"
        );
        IrLabel::Named(name.to_string())
    }

    pub fn emit_label(&mut self, label: IrLabel) {
        self.code.push(Instr::Label(label));
    }

    pub fn emit_func(&mut self, label: IrLabel) {
        self.code.push(Instr::Func(label));
    }

    pub fn emit_assign(&mut self, dst: Operand, src: Operand) {
        assert!(dst.is_assignable(), "assignment to non-assignable operand");
        self.code.push(Instr::Assign { dst, src });
    }

    pub fn emit_arith(&mut self, op: ArithOp, dst: Operand, lhs: Operand, rhs: Operand) {
        assert!(
            matches!(dst, Operand::Var(_)),
            "arithmetic destination must be a variable"
        );
        self.code.push(Instr::Arith { op, dst, lhs, rhs });
    }

    pub fn emit_goto(&mut self, target: IrLabel) {
        self.code.push(Instr::Goto(target));
    }

    pub fn emit_branch(&mut self, op: CmpOp, lhs: Operand, rhs: Operand, target: IrLabel) {
        self.code.push(Instr::Branch {
            op,
            lhs,
            rhs,
            target,
        });
    }

    pub fn emit_return(&mut self, value: Operand) {
        self.code.push(Instr::Return(value));
    }

    pub fn emit_dec(&mut self, var: Operand, size: u32) {
        assert!(
            matches!(var, Operand::Var(_)),
            "Dec target must be a variable"
        );
        self.code.push(Instr::Dec { var, size });
    }

    pub fn emit_arg(&mut self, value: Operand) {
        self.code.push(Instr::Arg(value));
    }

    pub fn emit_call(&mut self, dst: Operand, func: IrLabel) {
        assert!(
            matches!(dst, Operand::Var(_)),
            "call destination must be a variable"
        );
        self.code.push(Instr::Call { dst, func });
    }

    pub fn emit_param(&mut self, param: Operand) {
        assert!(
            matches!(param, Operand::Var(_)),
            "Param operand must be a variable"
        );
        self.code.push(Instr::Param(param));
    }

    pub fn emit_read(&mut self, dst: Operand) {
        assert!(
            matches!(dst, Operand::Var(_)),
            "Read destination must be a variable"
        );
        self.code.push(Instr::Read(dst));
    }

    pub fn emit_write(&mut self, value: Operand) {
        self.code.push(Instr::Write(value));
    }

    /// Finalizes the stream into a program.
    pub fn into_program(self) -> IrProgram {
        IrProgram {
            code: self.code,
            vars: self.vars,
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
