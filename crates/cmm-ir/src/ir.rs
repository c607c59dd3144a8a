//! The three-address IR data model.
//!
//! A lowered program is a flat instruction array in execution order, plus a
//! table of the variables the translation allocated. `Label` and `Func`
//! instructions mark positions in the stream and execute as no-ops.
//!
//! Variables are uniquely numbered temporaries printed as `t<id>`; whether a
//! variable holds the *address* of an aggregate rather than a scalar value
//! (`is_ref`) is recorded in the variable table and fixed at allocation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use cmm_core::ops::{ArithOp, CmpOp};

/// An IR variable, printed as `t<id>`. Ids are assigned in allocation
/// order, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrVar(pub u32);

impl fmt::Display for IrVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A jump target.
///
/// Named labels carry a source function's identifier verbatim; anonymous
/// labels are printed `l<n>` with `n` monotonic across the translation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrLabel {
    Named(String),
    Anon(u32),
}

impl IrLabel {
    /// Whether `name` reads as an anonymous label (`l<n>`).
    ///
    /// Named labels carry source identifiers verbatim, so an identifier of
    /// this shape would be indistinguishable from an anonymous label in the
    /// printed form. The lowering pass rejects such function names.
    pub fn is_anon_spelling(name: &str) -> bool {
        name.strip_prefix('l')
            .and_then(|digits| digits.parse::<u32>().ok())
            .is_some()
    }
}

impl fmt::Display for IrLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrLabel::Named(name) => write!(f, "{name}"),
            IrLabel::Anon(n) => write!(f, "l{n}"),
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Read or write variable `v`.
    Var(IrVar),
    /// Signed integer immediate.
    Const(i32),
    /// The address of `v`; valid only where `v` backs storage reserved by a
    /// `Dec`.
    Ref(IrVar),
    /// The value stored at the address held in `v`.
    Deref(IrVar),
}

impl Operand {
    /// An operand is assignable iff it is `Var` or `Deref`.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Operand::Var(_) | Operand::Deref(_))
    }

    /// The variable this operand references, if any.
    pub fn var(&self) -> Option<IrVar> {
        match self {
            Operand::Var(v) | Operand::Ref(v) | Operand::Deref(v) => Some(*v),
            Operand::Const(_) => None,
        }
    }
}

/// A three-address instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    /// Jump-target marker; executes as a no-op.
    Label(IrLabel),
    /// Function-header marker; executes as a no-op.
    Func(IrLabel),
    Assign {
        dst: Operand,
        src: Operand,
    },
    /// `dst := lhs op rhs` for `+ - * /`. `dst` is always `Var`.
    Arith {
        op: ArithOp,
        dst: Operand,
        lhs: Operand,
        rhs: Operand,
    },
    Goto(IrLabel),
    /// `IF lhs op rhs GOTO target`.
    Branch {
        op: CmpOp,
        lhs: Operand,
        rhs: Operand,
        target: IrLabel,
    },
    Return(Operand),
    /// Reserve `size` bytes of storage, addressable through `var`.
    Dec {
        var: Operand,
        size: u32,
    },
    /// Push one argument for the next `Call`.
    Arg(Operand),
    Call {
        dst: Operand,
        func: IrLabel,
    },
    /// Declare one incoming parameter, in declaration order.
    Param(Operand),
    Read(Operand),
    Write(Operand),
}

impl Instr {
    /// All operands of this instruction, in source order.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instr::Label(_) | Instr::Func(_) | Instr::Goto(_) => vec![],
            Instr::Assign { dst, src } => vec![dst, src],
            Instr::Arith { dst, lhs, rhs, .. } => vec![dst, lhs, rhs],
            Instr::Branch { lhs, rhs, .. } => vec![lhs, rhs],
            Instr::Return(op)
            | Instr::Arg(op)
            | Instr::Param(op)
            | Instr::Read(op)
            | Instr::Write(op) => vec![op],
            Instr::Dec { var, .. } => vec![var],
            Instr::Call { dst, .. } => vec![dst],
        }
    }

    /// The jump target of this instruction, if it has one.
    pub fn jump_target(&self) -> Option<&IrLabel> {
        match self {
            Instr::Goto(l) | Instr::Branch { target: l, .. } => Some(l),
            _ => None,
        }
    }
}

/// One entry of the variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrVarInfo {
    pub id: IrVar,
    /// `true` iff the variable holds the address of an aggregate rather
    /// than a scalar value.
    pub is_ref: bool,
}

/// A lowered translation unit: instructions in execution order plus the
/// variable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrProgram {
    pub code: Vec<Instr>,
    pub vars: Vec<IrVarInfo>,
}

impl IrProgram {
    /// Number of variables the translation allocated.
    pub fn var_count(&self) -> u32 {
        self.vars.len() as u32
    }

    /// Whether `var` holds an aggregate address. `None` for ids outside the
    /// table.
    pub fn is_ref(&self, var: IrVar) -> Option<bool> {
        let index = (var.0 as usize).checked_sub(1)?;
        self.vars.get(index).map(|info| info.is_ref)
    }
}
