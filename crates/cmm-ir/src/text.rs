//! Canonical text form of the IR: printer and the inverse parser.
//!
//! One instruction per line. Operands print as `t<n>` (variable), `#k`
//! (constant), `&t<n>` (address-of), `*t<n>` (dereference); relops print as
//! `> < >= <= == !=`. [`parse_program`] is a simple whitespace-tokenizing
//! parser over the same grammar, so printing then parsing then printing is
//! the identity.

use std::fmt;

use thiserror::Error;

use cmm_core::ops::{ArithOp, CmpOp};

use crate::ir::{Instr, IrLabel, IrProgram, IrVar, Operand};

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(v) => write!(f, "{v}"),
            Operand::Const(k) => write!(f, "#{k}"),
            Operand::Ref(v) => write!(f, "&{v}"),
            Operand::Deref(v) => write!(f, "*{v}"),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(l) => write!(f, "LABEL {l} :"),
            Instr::Func(l) => write!(f, "FUNCTION {l} :"),
            Instr::Assign { dst, src } => write!(f, "{dst} := {src}"),
            Instr::Arith { op, dst, lhs, rhs } => write!(f, "{dst} := {lhs} {op} {rhs}"),
            Instr::Goto(l) => write!(f, "GOTO {l}"),
            Instr::Branch {
                op,
                lhs,
                rhs,
                target,
            } => write!(f, "IF {lhs} {op} {rhs} GOTO {target}"),
            Instr::Return(v) => write!(f, "RETURN {v}"),
            Instr::Dec { var, size } => write!(f, "DEC {var} {size}"),
            Instr::Arg(v) => write!(f, "ARG {v}"),
            Instr::Call { dst, func } => write!(f, "{dst} := CALL {func}"),
            Instr::Param(v) => write!(f, "PARAM {v}"),
            Instr::Read(v) => write!(f, "READ {v}"),
            Instr::Write(v) => write!(f, "WRITE {v}"),
        }
    }
}

impl fmt::Display for IrProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.code {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}

impl IrProgram {
    /// The canonical text form, one instruction per line.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

/// Errors produced while parsing the canonical text form.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("line {line}: unrecognized instruction '{text}'")]
    UnknownInstruction { line: usize, text: String },

    #[error("line {line}: invalid operand '{token}'")]
    InvalidOperand { line: usize, token: String },

    #[error("line {line}: invalid operator '{token}'")]
    InvalidOperator { line: usize, token: String },

    #[error("line {line}: invalid size '{token}'")]
    InvalidSize { line: usize, token: String },
}

/// Parses the canonical text form back into an instruction list.
///
/// Blank lines are skipped. Anything else must be exactly one instruction in
/// the grammar the printer produces.
pub fn parse_program(text: &str) -> Result<Vec<Instr>, TextError> {
    let mut code = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        code.push(parse_instr(&tokens, line, raw)?);
    }
    Ok(code)
}

fn parse_instr(tokens: &[&str], line: usize, raw: &str) -> Result<Instr, TextError> {
    match tokens {
        ["LABEL", name, ":"] => Ok(Instr::Label(parse_label(name))),
        ["FUNCTION", name, ":"] => Ok(Instr::Func(parse_label(name))),
        ["GOTO", name] => Ok(Instr::Goto(parse_label(name))),
        ["IF", lhs, op, rhs, "GOTO", name] => Ok(Instr::Branch {
            op: parse_cmp_op(op, line)?,
            lhs: parse_operand(lhs, line)?,
            rhs: parse_operand(rhs, line)?,
            target: parse_label(name),
        }),
        ["RETURN", v] => Ok(Instr::Return(parse_operand(v, line)?)),
        ["DEC", var, size] => Ok(Instr::Dec {
            var: parse_operand(var, line)?,
            size: size.parse().map_err(|_| TextError::InvalidSize {
                line,
                token: size.to_string(),
            })?,
        }),
        ["ARG", v] => Ok(Instr::Arg(parse_operand(v, line)?)),
        ["PARAM", v] => Ok(Instr::Param(parse_operand(v, line)?)),
        ["READ", v] => Ok(Instr::Read(parse_operand(v, line)?)),
        ["WRITE", v] => Ok(Instr::Write(parse_operand(v, line)?)),
        [dst, ":=", "CALL", name] => Ok(Instr::Call {
            dst: parse_operand(dst, line)?,
            func: parse_label(name),
        }),
        [dst, ":=", src] => Ok(Instr::Assign {
            dst: parse_operand(dst, line)?,
            src: parse_operand(src, line)?,
        }),
        [dst, ":=", lhs, op, rhs] => Ok(Instr::Arith {
            op: parse_arith_op(op, line)?,
            dst: parse_operand(dst, line)?,
            lhs: parse_operand(lhs, line)?,
            rhs: parse_operand(rhs, line)?,
        }),
        _ => Err(TextError::UnknownInstruction {
            line,
            text: raw.trim().to_string(),
        }),
    }
}

fn parse_operand(token: &str, line: usize) -> Result<Operand, TextError> {
    if let Some(rest) = token.strip_prefix('#') {
        let value = rest.parse().map_err(|_| TextError::InvalidOperand {
            line,
            token: token.to_string(),
        })?;
        return Ok(Operand::Const(value));
    }
    if let Some(rest) = token.strip_prefix('&') {
        return Ok(Operand::Ref(parse_var(rest, line)?));
    }
    if let Some(rest) = token.strip_prefix('*') {
        return Ok(Operand::Deref(parse_var(rest, line)?));
    }
    Ok(Operand::Var(parse_var(token, line)?))
}

fn parse_var(token: &str, line: usize) -> Result<IrVar, TextError> {
    token
        .strip_prefix('t')
        .and_then(|digits| digits.parse().ok())
        .map(IrVar)
        .ok_or_else(|| TextError::InvalidOperand {
            line,
            token: token.to_string(),
        })
}

/// `l<digits>` is an anonymous label; any other token is a name carried
/// verbatim. The two flavours cannot collide: the lowering pass refuses to
/// mint a named label that uses the anonymous spelling.
fn parse_label(token: &str) -> IrLabel {
    token
        .strip_prefix('l')
        .and_then(|digits| digits.parse().ok())
        .map_or_else(|| IrLabel::Named(token.to_string()), IrLabel::Anon)
}

fn parse_cmp_op(token: &str, line: usize) -> Result<CmpOp, TextError> {
    match token {
        "==" => Ok(CmpOp::Eq),
        "!=" => Ok(CmpOp::Ne),
        "<" => Ok(CmpOp::Lt),
        "<=" => Ok(CmpOp::Le),
        ">" => Ok(CmpOp::Gt),
        ">=" => Ok(CmpOp::Ge),
        _ => Err(TextError::InvalidOperator {
            line,
            token: token.to_string(),
        }),
    }
}

fn parse_arith_op(token: &str, line: usize) -> Result<ArithOp, TextError> {
    match token {
        "+" => Ok(ArithOp::Add),
        "-" => Ok(ArithOp::Sub),
        "*" => Ok(ArithOp::Mul),
        "/" => Ok(ArithOp::Div),
        _ => Err(TextError::InvalidOperator {
            line,
            token: token.to_string(),
        }),
    }
}
