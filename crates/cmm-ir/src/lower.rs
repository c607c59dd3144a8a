//! Lowering from the decorated syntax tree to three-address IR.
//!
//! [`lower_program`] drives a single synchronous pass over the tree. The
//! statement translator walks top-down; expressions are lowered bottom-up,
//! each returning an [`ExpValue`] naming the fresh variable that holds its
//! result and whether that variable holds an aggregate *address* rather than
//! a scalar value. Result variables are allocated after their operands, so
//! variable numbering follows evaluation order.
//!
//! Boolean expressions are translated twice over: in value position they
//! materialize 0/1 around a condition translation; in condition position
//! `lower_cond` goto-threads the true/false labels so `&&` and `||`
//! short-circuit structurally, with no later pass needed.
//!
//! Aggregates (arrays, structs) are handled by address throughout: locals
//! reserve storage with `Dec` and bind a reference variable to its address,
//! element access is explicit offset arithmetic, element loads and stores go
//! through `Deref`, and aggregate-typed call arguments pass the address
//! itself.

use std::collections::HashMap;

use tracing::trace;

use cmm_core::ast::{Block, Expr, ExprKind, ExtDef, FunctionDef, Program, Stmt, VarDef};
use cmm_core::id::SymbolId;
use cmm_core::ops::{ArithOp, CmpOp};
use cmm_core::types::{Ty, WORD_SIZE};

use crate::emit::Emitter;
use crate::error::LowerError;
use crate::ir::{IrLabel, IrProgram, IrVar, Operand};

/// Lowers a whole decorated program to IR.
///
/// Translation either completes or fails on the first unsupported construct
/// or structural violation; there is no partial output.
pub fn lower_program(program: &Program) -> Result<IrProgram, LowerError> {
    Lowering::new(program).run()
}

/// The result of lowering one expression: the variable holding it, and
/// whether that variable holds an aggregate address.
#[derive(Debug, Clone, Copy)]
struct ExpValue {
    var: IrVar,
    is_ref: bool,
}

impl ExpValue {
    fn value(var: IrVar) -> Self {
        ExpValue { var, is_ref: false }
    }

    fn address(var: IrVar) -> Self {
        ExpValue { var, is_ref: true }
    }
}

/// The operand denoting the scalar value referred to by `value`: a
/// dereference when the variable holds an address, the variable itself
/// otherwise. Contexts that need an address (aggregate copies, aggregate
/// arguments) bypass this and use `Operand::Var` directly.
fn rval(value: ExpValue) -> Operand {
    if value.is_ref {
        Operand::Deref(value.var)
    } else {
        Operand::Var(value.var)
    }
}

/// Translation context for one program: the emitter plus the side tables
/// mapping symbols to their IR variables and function labels.
struct Lowering<'a> {
    program: &'a Program,
    emit: Emitter,
    var_of: HashMap<SymbolId, IrVar>,
    label_of: HashMap<SymbolId, IrLabel>,
}

impl<'a> Lowering<'a> {
    fn new(program: &'a Program) -> Self {
        Lowering {
            program,
            emit: Emitter::new(),
            var_of: HashMap::new(),
            label_of: HashMap::new(),
        }
    }

    fn run(mut self) -> Result<IrProgram, LowerError> {
        for item in &self.program.items {
            match item {
                ExtDef::Function(f) => self.lower_function(f)?,
                ExtDef::GlobalVars { line, .. } => {
                    return Err(LowerError::GlobalVariable { line: *line });
                }
                ExtDef::Prototype { line, .. } => {
                    return Err(LowerError::FunctionDeclaration { line: *line });
                }
                // Contributes types only; nothing to lower.
                ExtDef::TypeDecl { .. } => {}
            }
        }
        Ok(self.emit.into_program())
    }

    fn lower_function(&mut self, f: &FunctionDef) -> Result<(), LowerError> {
        let sym = self.program.symbol(f.symbol)?;
        trace!(line = f.line, name = %sym.name, "lowering function");

        // A name shaped like `l<n>` would print identically to an anonymous
        // label.
        if IrLabel::is_anon_spelling(&sym.name) {
            return Err(LowerError::ReservedLabelName {
                name: sym.name.clone(),
                line: f.line,
            });
        }

        let label = self.emit.new_named_label(&sym.name);
        self.label_of.insert(f.symbol, label.clone());
        self.emit.emit_func(label);

        for &param in &f.params {
            let param_sym = self.program.symbol(param)?;
            let is_ref = self.program.types.is_aggregate(param_sym.ty);
            let var = self.emit.new_var(is_ref);
            self.var_of.insert(param, var);
            self.emit.emit_param(Operand::Var(var));
        }

        self.lower_block(&f.body)
    }

    fn lower_block(&mut self, block: &Block) -> Result<(), LowerError> {
        for def in &block.defs {
            self.lower_var_def(def)?;
        }
        for stmt in &block.stmts {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    /// Scalar locals just get a variable. Aggregate locals reserve their
    /// storage with `Dec` and bind a reference variable to its address.
    fn lower_var_def(&mut self, def: &VarDef) -> Result<(), LowerError> {
        let sym = self.program.symbol(def.symbol)?;
        trace!(line = def.line, name = %sym.name, "lowering local");

        let var = if self.program.types.is_aggregate(sym.ty) {
            let size = self.program.types.size_of(sym.ty)?;
            let var = self.emit.new_var(true);
            let storage = self.emit.new_var(false);
            self.emit.emit_dec(Operand::Var(storage), size);
            self.emit.emit_assign(Operand::Var(var), Operand::Ref(storage));
            var
        } else {
            self.emit.new_var(false)
        };
        self.var_of.insert(def.symbol, var);

        if let Some(init) = &def.init {
            let temp = self.lower_expr(init)?;
            self.emit.emit_assign(Operand::Var(var), rval(temp));
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), LowerError> {
        match stmt {
            Stmt::Expr(e) => {
                let value = self.lower_expr(e)?;
                // The result is discarded: funnel it into the sentinel so
                // the assignment exists but is dead.
                let ignore = self.emit.ignore_var();
                self.emit
                    .emit_assign(Operand::Var(ignore), Operand::Var(value.var));
            }
            Stmt::Block(block) => self.lower_block(block)?,
            Stmt::Return { value, line } => {
                trace!(line = *line, "lowering return");
                let v1 = self.lower_expr(value)?;
                let v2 = self.emit.new_var(false);
                self.emit.emit_assign(Operand::Var(v2), rval(v1));
                self.emit.emit_return(Operand::Var(v2));
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch: None,
                line,
            } => {
                trace!(line = *line, "lowering if");
                let true_label = self.emit.new_label();
                let false_label = self.emit.new_label();
                self.lower_cond(cond, &true_label, &false_label)?;
                self.emit.emit_label(true_label);
                self.lower_stmt(then_branch)?;
                self.emit.emit_label(false_label);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch: Some(else_branch),
                line,
            } => {
                trace!(line = *line, "lowering if-else");
                let true_label = self.emit.new_label();
                let false_label = self.emit.new_label();
                let end_label = self.emit.new_label();
                self.lower_cond(cond, &true_label, &false_label)?;
                self.emit.emit_label(true_label);
                self.lower_stmt(then_branch)?;
                self.emit.emit_goto(end_label.clone());
                self.emit.emit_label(false_label);
                self.lower_stmt(else_branch)?;
                self.emit.emit_label(end_label);
            }
            Stmt::While { cond, body, line } => {
                trace!(line = *line, "lowering while");
                let start_label = self.emit.new_label();
                let true_label = self.emit.new_label();
                let false_label = self.emit.new_label();
                self.emit.emit_label(start_label.clone());
                self.lower_cond(cond, &true_label, &false_label)?;
                self.emit.emit_label(true_label);
                self.lower_stmt(body)?;
                self.emit.emit_goto(start_label);
                self.emit.emit_label(false_label);
            }
        }
        Ok(())
    }

    fn lower_expr(&mut self, e: &Expr) -> Result<ExpValue, LowerError> {
        trace!(line = e.line, "lowering expression");
        match &e.kind {
            ExprKind::Int(k) => {
                let var = self.emit.new_var(false);
                self.emit.emit_assign(Operand::Var(var), Operand::Const(*k));
                Ok(ExpValue::value(var))
            }
            ExprKind::Float(_) => Err(LowerError::FloatLiteral { line: e.line }),
            ExprKind::Var(sym) => {
                // The copy inherits the source variable's addressness.
                let src = self.var_for(*sym, e.line)?;
                let var = self.emit.new_var(src.is_ref);
                self.emit
                    .emit_assign(Operand::Var(var), Operand::Var(src.var));
                Ok(ExpValue {
                    var,
                    is_ref: src.is_ref,
                })
            }
            ExprKind::Paren(inner) => self.lower_expr(inner),
            ExprKind::Neg(inner) => {
                let value = self.lower_expr(inner)?;
                let var = self.emit.new_var(false);
                self.emit.emit_arith(
                    ArithOp::Sub,
                    Operand::Var(var),
                    Operand::Const(0),
                    rval(value),
                );
                Ok(ExpValue::value(var))
            }
            ExprKind::Not(_) | ExprKind::And { .. } | ExprKind::Or { .. } | ExprKind::Cmp { .. } => {
                self.lower_bool_expr(e)
            }
            ExprKind::Arith { op, lhs, rhs } => {
                let l = self.lower_expr(lhs)?;
                let r = self.lower_expr(rhs)?;
                let var = self.emit.new_var(false);
                self.emit
                    .emit_arith(*op, Operand::Var(var), rval(l), rval(r));
                Ok(ExpValue::value(var))
            }
            ExprKind::Assign { target, value } => self.lower_assign(e, target, value),
            ExprKind::Index { base, index } => {
                let offset = self.lower_expr(base)?;
                if !offset.is_ref {
                    return Err(LowerError::NotAddressable { line: e.line });
                }
                // The node's own static type is the element type.
                let element_size = self.program.types.size_of(e.ty)?;
                let idx = self.lower_expr(index)?;
                let scaled = self.emit.new_var(false);
                self.emit.emit_arith(
                    ArithOp::Mul,
                    Operand::Var(scaled),
                    rval(idx),
                    Operand::Const(element_size as i32),
                );
                let address = self.emit.new_var(false);
                self.emit.emit_arith(
                    ArithOp::Add,
                    Operand::Var(address),
                    Operand::Var(offset.var),
                    Operand::Var(scaled),
                );
                let var = self.emit.new_var(true);
                self.emit
                    .emit_assign(Operand::Var(var), Operand::Var(address));
                Ok(ExpValue::address(var))
            }
            ExprKind::Member { base, field } => {
                let offset = self.lower_expr(base)?;
                if !offset.is_ref {
                    return Err(LowerError::NotAddressable { line: e.line });
                }
                let byte_offset = self.program.types.field_offset(base.ty, field)?;
                let address = self.emit.new_var(false);
                self.emit.emit_arith(
                    ArithOp::Add,
                    Operand::Var(address),
                    Operand::Var(offset.var),
                    Operand::Const(byte_offset as i32),
                );
                let var = self.emit.new_var(true);
                self.emit
                    .emit_assign(Operand::Var(var), Operand::Var(address));
                Ok(ExpValue::address(var))
            }
            ExprKind::Call { callee, args } => self.lower_call(e, *callee, args),
        }
    }

    /// A boolean expression whose *value* is needed: materialize 0, run the
    /// condition translation, and overwrite with 1 on the true path.
    fn lower_bool_expr(&mut self, e: &Expr) -> Result<ExpValue, LowerError> {
        let true_label = self.emit.new_label();
        let false_label = self.emit.new_label();
        let var = self.emit.new_var(false);
        self.emit.emit_assign(Operand::Var(var), Operand::Const(0));
        self.lower_cond(e, &true_label, &false_label)?;
        self.emit.emit_label(true_label);
        self.emit.emit_assign(Operand::Var(var), Operand::Const(1));
        self.emit.emit_label(false_label);
        Ok(ExpValue::value(var))
    }

    /// Emits jumps to `true_label` or `false_label` reflecting the
    /// truthiness of `e`. `&&` and `||` thread a fresh link label so the
    /// right operand is only evaluated when it can still decide the outcome.
    fn lower_cond(
        &mut self,
        e: &Expr,
        true_label: &IrLabel,
        false_label: &IrLabel,
    ) -> Result<(), LowerError> {
        match &e.kind {
            ExprKind::Not(inner) => self.lower_cond(inner, false_label, true_label),
            ExprKind::Paren(inner) => self.lower_cond(inner, true_label, false_label),
            ExprKind::And { lhs, rhs } => {
                let link = self.emit.new_label();
                self.lower_cond(lhs, &link, false_label)?;
                self.emit.emit_label(link);
                self.lower_cond(rhs, true_label, false_label)
            }
            ExprKind::Or { lhs, rhs } => {
                let link = self.emit.new_label();
                self.lower_cond(lhs, true_label, &link)?;
                self.emit.emit_label(link);
                self.lower_cond(rhs, true_label, false_label)
            }
            ExprKind::Cmp { op, lhs, rhs } => {
                let l = self.lower_expr(lhs)?;
                let r = self.lower_expr(rhs)?;
                self.emit
                    .emit_branch(*op, rval(l), rval(r), true_label.clone());
                self.emit.emit_goto(false_label.clone());
                Ok(())
            }
            _ => {
                let value = self.lower_expr(e)?;
                self.emit.emit_branch(
                    CmpOp::Ne,
                    rval(value),
                    Operand::Const(0),
                    true_label.clone(),
                );
                self.emit.emit_goto(false_label.clone());
                Ok(())
            }
        }
    }

    /// The grammar restricts assignment targets to an identifier, an index
    /// expression, or a member access; everything else is rejected.
    fn lower_assign(
        &mut self,
        e: &Expr,
        target: &Expr,
        value: &Expr,
    ) -> Result<ExpValue, LowerError> {
        match &target.kind {
            ExprKind::Var(sym) => {
                let dst = self.var_for(*sym, target.line)?;
                let temp = self.lower_expr(value)?;
                match self.program.types.resolve(target.ty)? {
                    Ty::Int => {
                        self.emit.emit_assign(Operand::Var(dst.var), rval(temp));
                        let var = self.emit.new_var(false);
                        self.emit
                            .emit_assign(Operand::Var(var), Operand::Var(dst.var));
                        Ok(ExpValue::value(var))
                    }
                    Ty::Array { .. } => {
                        if !dst.is_ref || !temp.is_ref {
                            return Err(LowerError::NotAddressable { line: e.line });
                        }
                        let dst_size = self.program.types.size_of(target.ty)?;
                        let src_size = self.program.types.size_of(value.ty)?;
                        self.copy_aggregate(dst.var, temp.var, dst_size.min(src_size));
                        let var = self.emit.new_var(true);
                        self.emit
                            .emit_assign(Operand::Var(var), Operand::Var(temp.var));
                        Ok(ExpValue::address(var))
                    }
                    Ty::Struct(_) => Err(LowerError::StructAssignment { line: e.line }),
                    Ty::Function { .. } => Err(LowerError::InvalidAssignTarget { line: e.line }),
                }
            }
            ExprKind::Index { .. } => {
                // Lowering the index expression itself yields the element
                // address.
                let offset = self.lower_expr(target)?;
                if !offset.is_ref {
                    return Err(LowerError::NotAddressable { line: target.line });
                }
                let temp = self.lower_expr(value)?;
                match self.program.types.resolve(target.ty)? {
                    Ty::Int => {
                        self.emit.emit_assign(Operand::Deref(offset.var), rval(temp));
                        let var = self.emit.new_var(false);
                        self.emit.emit_assign(Operand::Var(var), rval(temp));
                        Ok(ExpValue::value(var))
                    }
                    Ty::Array { .. } => {
                        if !temp.is_ref {
                            return Err(LowerError::NotAddressable { line: e.line });
                        }
                        let dst_size = self.program.types.size_of(target.ty)?;
                        let src_size = self.program.types.size_of(value.ty)?;
                        self.copy_aggregate(offset.var, temp.var, dst_size.min(src_size));
                        let var = self.emit.new_var(true);
                        self.emit
                            .emit_assign(Operand::Var(var), Operand::Var(temp.var));
                        Ok(ExpValue::address(var))
                    }
                    Ty::Struct(_) => Err(LowerError::StructAssignment { line: e.line }),
                    Ty::Function { .. } => Err(LowerError::InvalidAssignTarget { line: e.line }),
                }
            }
            ExprKind::Member { .. } => {
                let offset = self.lower_expr(target)?;
                if !offset.is_ref {
                    return Err(LowerError::NotAddressable { line: target.line });
                }
                let temp = self.lower_expr(value)?;
                match self.program.types.resolve(target.ty)? {
                    Ty::Int => {
                        self.emit.emit_assign(Operand::Deref(offset.var), rval(temp));
                        let var = self.emit.new_var(false);
                        self.emit.emit_assign(Operand::Var(var), rval(temp));
                        Ok(ExpValue::value(var))
                    }
                    Ty::Array { .. } | Ty::Struct(_) => {
                        Err(LowerError::AggregateMemberAssignment { line: e.line })
                    }
                    Ty::Function { .. } => Err(LowerError::InvalidAssignTarget { line: e.line }),
                }
            }
            _ => Err(LowerError::InvalidAssignTarget { line: e.line }),
        }
    }

    /// Calls: `read`/`write` are intrinsics recognized by name; everything
    /// else evaluates its arguments in source order, then pushes `Arg`s in
    /// reverse. Aggregate parameters receive the argument's address
    /// (`Var`), scalars its value (`Rval`).
    fn lower_call(
        &mut self,
        e: &Expr,
        callee: SymbolId,
        args: &[Expr],
    ) -> Result<ExpValue, LowerError> {
        let sym = self.program.symbol(callee)?;

        if sym.name == "read" {
            if !args.is_empty() {
                return Err(LowerError::CallArity {
                    name: sym.name.clone(),
                    expected: 0,
                    found: args.len(),
                    line: e.line,
                });
            }
            let var = self.emit.new_var(false);
            self.emit.emit_read(Operand::Var(var));
            return Ok(ExpValue::value(var));
        }

        if sym.name == "write" {
            if args.len() != 1 {
                return Err(LowerError::CallArity {
                    name: sym.name.clone(),
                    expected: 1,
                    found: args.len(),
                    line: e.line,
                });
            }
            let value = self.lower_expr(&args[0])?;
            self.emit.emit_write(rval(value));
            let var = self.emit.new_var(false);
            self.emit.emit_assign(Operand::Var(var), Operand::Const(0));
            return Ok(ExpValue::value(var));
        }

        let Ty::Function { params, .. } = self.program.types.resolve(sym.ty)? else {
            return Err(LowerError::NotAFunction {
                name: sym.name.clone(),
                line: e.line,
            });
        };
        if params.len() != args.len() {
            return Err(LowerError::CallArity {
                name: sym.name.clone(),
                expected: params.len(),
                found: args.len(),
                line: e.line,
            });
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.lower_expr(arg)?);
        }
        for (value, &formal) in values.iter().zip(params.iter()).rev() {
            if self.program.types.is_aggregate(formal) {
                if !value.is_ref {
                    return Err(LowerError::NotAddressable { line: e.line });
                }
                self.emit.emit_arg(Operand::Var(value.var));
            } else {
                self.emit.emit_arg(rval(*value));
            }
        }

        let label = self
            .label_of
            .get(&callee)
            .cloned()
            .ok_or_else(|| LowerError::UnresolvedFunction {
                name: sym.name.clone(),
                line: e.line,
            })?;
        let var = self.emit.new_var(false);
        self.emit.emit_call(Operand::Var(var), label);
        Ok(ExpValue::value(var))
    }

    /// Word-at-a-time copy between two aggregate addresses. One pair of
    /// scratch address variables is reused across all words.
    fn copy_aggregate(&mut self, dst: IrVar, src: IrVar, size: u32) {
        let dst_addr = self.emit.new_var(false);
        let src_addr = self.emit.new_var(false);
        for offset in (0..size).step_by(WORD_SIZE as usize) {
            self.emit.emit_arith(
                ArithOp::Add,
                Operand::Var(dst_addr),
                Operand::Var(dst),
                Operand::Const(offset as i32),
            );
            self.emit.emit_arith(
                ArithOp::Add,
                Operand::Var(src_addr),
                Operand::Var(src),
                Operand::Const(offset as i32),
            );
            self.emit
                .emit_assign(Operand::Deref(dst_addr), Operand::Deref(src_addr));
        }
    }

    fn var_for(&self, sym: SymbolId, line: u32) -> Result<ExpValue, LowerError> {
        let Some(&var) = self.var_of.get(&sym) else {
            let name = self.program.symbol(sym)?.name.clone();
            return Err(LowerError::UnboundVariable { name, line });
        };
        Ok(ExpValue {
            var,
            is_ref: self.emit.is_ref(var),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmm_core::symbol::Symbol;
    use cmm_core::type_id::TypeId;

    fn int_expr(k: i32) -> Expr {
        Expr::new(ExprKind::Int(k), TypeId::INT, 1)
    }

    /// `int main() { return 0; }` — the smallest complete translation.
    #[test]
    fn return_zero_instruction_stream() {
        let mut program = Program::new();
        let func_ty = program.types.register(Ty::Function {
            params: vec![],
            return_type: TypeId::INT,
        });
        let main = program.symbols.add(Symbol::new("main", 1, func_ty));
        program.items.push(ExtDef::Function(FunctionDef {
            symbol: main,
            params: vec![],
            body: Block {
                defs: vec![],
                stmts: vec![Stmt::Return {
                    value: int_expr(0),
                    line: 1,
                }],
            },
            line: 1,
        }));

        let ir = lower_program(&program).unwrap();
        let main_label = IrLabel::Named("main".into());
        assert_eq!(
            ir.code,
            vec![
                crate::ir::Instr::Func(main_label),
                crate::ir::Instr::Assign {
                    dst: Operand::Var(IrVar(2)),
                    src: Operand::Const(0),
                },
                crate::ir::Instr::Assign {
                    dst: Operand::Var(IrVar(3)),
                    src: Operand::Var(IrVar(2)),
                },
                crate::ir::Instr::Return(Operand::Var(IrVar(3))),
            ]
        );
        // t1 is the ignore sentinel; t2 and t3 come from the return.
        assert_eq!(ir.var_count(), 3);
    }

    #[test]
    fn rval_respects_addressness() {
        assert_eq!(rval(ExpValue::value(IrVar(5))), Operand::Var(IrVar(5)));
        assert_eq!(rval(ExpValue::address(IrVar(5))), Operand::Deref(IrVar(5)));
    }

    #[test]
    fn global_variables_are_rejected() {
        let mut program = Program::new();
        let g = program.symbols.add(Symbol::new("g", 1, TypeId::INT));
        program.items.push(ExtDef::GlobalVars {
            symbols: vec![g],
            line: 1,
        });
        assert!(matches!(
            lower_program(&program),
            Err(LowerError::GlobalVariable { line: 1 })
        ));
    }

    #[test]
    fn prototypes_are_rejected() {
        let mut program = Program::new();
        let func_ty = program.types.register(Ty::Function {
            params: vec![],
            return_type: TypeId::INT,
        });
        let f = program.symbols.add(Symbol::new("f", 3, func_ty));
        program
            .items
            .push(ExtDef::Prototype { symbol: f, line: 3 });
        assert!(matches!(
            lower_program(&program),
            Err(LowerError::FunctionDeclaration { line: 3 })
        ));
    }

    #[test]
    fn type_decls_lower_to_nothing() {
        let mut program = Program::new();
        program.items.push(ExtDef::TypeDecl { line: 1 });
        let ir = lower_program(&program).unwrap();
        assert!(ir.code.is_empty());
        // Only the ignore sentinel was allocated.
        assert_eq!(ir.var_count(), 1);
    }
}
