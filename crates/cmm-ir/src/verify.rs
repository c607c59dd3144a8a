//! Structural validation of finished IR programs.
//!
//! The translator establishes these properties by construction; the
//! validator re-checks them mechanically so that hand-built or parsed
//! programs (and translator regressions) are caught. It scans the whole
//! program and reports **all** findings at once rather than stopping at the
//! first.
//!
//! Checked properties:
//! 1. every `Goto`/`Branch` target is defined, and no label is defined twice;
//! 2. destinations of arithmetic, `Read`, `Call`, `Param`, and `Dec` are
//!    `Var` operands, and assignment left-hand sides are assignable;
//! 3. every referenced variable id is within the variable table;
//! 4. `&v` appears only for `v` that is the target of a `Dec` in the same
//!    function.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::ir::{Instr, IrLabel, IrProgram, IrVar, Operand};

/// One structural defect found in an IR program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Finding {
    #[error("instruction {index}: jump to undefined label '{label}'")]
    UndefinedTarget { index: usize, label: IrLabel },

    #[error("instruction {index}: label '{label}' defined more than once")]
    DuplicateLabel { index: usize, label: IrLabel },

    #[error("instruction {index}: destination '{operand}' has the wrong operand kind")]
    BadDestination { index: usize, operand: Operand },

    #[error("instruction {index}: variable '{var}' is outside the variable table")]
    UnknownVar { index: usize, var: IrVar },

    #[error("instruction {index}: '&{var}' does not address storage reserved in its function")]
    RefWithoutDec { index: usize, var: IrVar },
}

/// Scans `program` and returns every structural defect found. An empty
/// result means the program is well-formed.
pub fn validate(program: &IrProgram) -> Vec<Finding> {
    let mut findings = Vec::new();

    // Pre-pass: defined labels, and per-function `Dec` targets. Instructions
    // before the first `Func` header form span 0.
    let mut defined: HashSet<&IrLabel> = HashSet::new();
    let mut span_of: Vec<usize> = Vec::with_capacity(program.code.len());
    let mut span_decs: HashMap<usize, HashSet<IrVar>> = HashMap::new();
    let mut span = 0;
    for instr in &program.code {
        match instr {
            Instr::Func(label) => {
                span += 1;
                defined.insert(label);
            }
            Instr::Label(label) => {
                defined.insert(label);
            }
            Instr::Dec { var, .. } => {
                if let Some(v) = var.var() {
                    span_decs.entry(span).or_default().insert(v);
                }
            }
            _ => {}
        }
        span_of.push(span);
    }

    let var_count = program.var_count();
    let mut seen: HashSet<&IrLabel> = HashSet::new();
    for (index, instr) in program.code.iter().enumerate() {
        // 1. label definedness and uniqueness
        match instr {
            Instr::Label(label) | Instr::Func(label) => {
                if !seen.insert(label) {
                    findings.push(Finding::DuplicateLabel {
                        index,
                        label: label.clone(),
                    });
                }
            }
            _ => {}
        }
        if let Some(target) = instr.jump_target() {
            if !defined.contains(target) {
                findings.push(Finding::UndefinedTarget {
                    index,
                    label: target.clone(),
                });
            }
        }

        // 2. destination operand kinds
        let var_only_dst = match instr {
            Instr::Arith { dst, .. } | Instr::Call { dst, .. } => Some(dst),
            Instr::Param(op) | Instr::Read(op) => Some(op),
            Instr::Dec { var, .. } => Some(var),
            _ => None,
        };
        if let Some(dst) = var_only_dst {
            if !matches!(dst, Operand::Var(_)) {
                findings.push(Finding::BadDestination {
                    index,
                    operand: *dst,
                });
            }
        }
        if let Instr::Assign { dst, .. } = instr {
            if !dst.is_assignable() {
                findings.push(Finding::BadDestination {
                    index,
                    operand: *dst,
                });
            }
        }

        // 3. variable ids within the table
        for operand in instr.operands() {
            if let Some(v) = operand.var() {
                if v.0 == 0 || v.0 > var_count {
                    findings.push(Finding::UnknownVar { index, var: v });
                }
            }
        }

        // 4. `Ref` only over storage reserved in the same function
        for operand in instr.operands() {
            if let Operand::Ref(v) = operand {
                let reserved = span_decs
                    .get(&span_of[index])
                    .is_some_and(|decs| decs.contains(v));
                if !reserved {
                    findings.push(Finding::RefWithoutDec { index, var: *v });
                }
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmm_core::ops::{ArithOp, CmpOp};

    use crate::ir::IrVarInfo;

    fn vars(n: u32) -> Vec<IrVarInfo> {
        (1..=n)
            .map(|id| IrVarInfo {
                id: IrVar(id),
                is_ref: false,
            })
            .collect()
    }

    fn well_formed() -> IrProgram {
        IrProgram {
            code: vec![
                Instr::Func(IrLabel::Named("main".into())),
                Instr::Dec {
                    var: Operand::Var(IrVar(2)),
                    size: 8,
                },
                Instr::Assign {
                    dst: Operand::Var(IrVar(1)),
                    src: Operand::Ref(IrVar(2)),
                },
                Instr::Branch {
                    op: CmpOp::Ne,
                    lhs: Operand::Var(IrVar(1)),
                    rhs: Operand::Const(0),
                    target: IrLabel::Anon(1),
                },
                Instr::Goto(IrLabel::Anon(2)),
                Instr::Label(IrLabel::Anon(1)),
                Instr::Label(IrLabel::Anon(2)),
                Instr::Return(Operand::Const(0)),
            ],
            vars: vars(2),
        }
    }

    #[test]
    fn well_formed_program_has_no_findings() {
        assert_eq!(validate(&well_formed()), vec![]);
    }

    #[test]
    fn undefined_jump_target_is_reported() {
        let program = IrProgram {
            code: vec![
                Instr::Func(IrLabel::Named("main".into())),
                Instr::Goto(IrLabel::Anon(9)),
            ],
            vars: vars(0),
        };
        assert_eq!(
            validate(&program),
            vec![Finding::UndefinedTarget {
                index: 1,
                label: IrLabel::Anon(9),
            }]
        );
    }

    #[test]
    fn duplicate_label_is_reported_at_second_definition() {
        let program = IrProgram {
            code: vec![
                Instr::Label(IrLabel::Anon(1)),
                Instr::Label(IrLabel::Anon(1)),
            ],
            vars: vars(0),
        };
        assert_eq!(
            validate(&program),
            vec![Finding::DuplicateLabel {
                index: 1,
                label: IrLabel::Anon(1),
            }]
        );
    }

    #[test]
    fn bad_destinations_are_reported() {
        let program = IrProgram {
            code: vec![
                Instr::Arith {
                    op: ArithOp::Add,
                    dst: Operand::Deref(IrVar(1)),
                    lhs: Operand::Const(1),
                    rhs: Operand::Const(2),
                },
                Instr::Assign {
                    dst: Operand::Const(3),
                    src: Operand::Const(4),
                },
                Instr::Read(Operand::Ref(IrVar(1))),
            ],
            vars: vars(1),
        };
        let findings = validate(&program);
        assert!(findings.contains(&Finding::BadDestination {
            index: 0,
            operand: Operand::Deref(IrVar(1)),
        }));
        assert!(findings.contains(&Finding::BadDestination {
            index: 1,
            operand: Operand::Const(3),
        }));
        // The Ref in Read is both a bad destination and an un-reserved Ref.
        assert!(findings.contains(&Finding::BadDestination {
            index: 2,
            operand: Operand::Ref(IrVar(1)),
        }));
    }

    #[test]
    fn out_of_table_variable_is_reported() {
        let program = IrProgram {
            code: vec![Instr::Return(Operand::Var(IrVar(5)))],
            vars: vars(2),
        };
        assert_eq!(
            validate(&program),
            vec![Finding::UnknownVar {
                index: 0,
                var: IrVar(5),
            }]
        );
    }

    #[test]
    fn ref_without_dec_is_reported() {
        let program = IrProgram {
            code: vec![
                Instr::Func(IrLabel::Named("main".into())),
                Instr::Assign {
                    dst: Operand::Var(IrVar(1)),
                    src: Operand::Ref(IrVar(2)),
                },
            ],
            vars: vars(2),
        };
        assert_eq!(
            validate(&program),
            vec![Finding::RefWithoutDec {
                index: 1,
                var: IrVar(2),
            }]
        );
    }

    #[test]
    fn ref_to_storage_declared_in_another_function_is_reported() {
        let program = IrProgram {
            code: vec![
                Instr::Func(IrLabel::Named("f".into())),
                Instr::Dec {
                    var: Operand::Var(IrVar(2)),
                    size: 8,
                },
                Instr::Func(IrLabel::Named("g".into())),
                Instr::Assign {
                    dst: Operand::Var(IrVar(1)),
                    src: Operand::Ref(IrVar(2)),
                },
            ],
            vars: vars(2),
        };
        assert_eq!(
            validate(&program),
            vec![Finding::RefWithoutDec {
                index: 3,
                var: IrVar(2),
            }]
        );
    }
}
