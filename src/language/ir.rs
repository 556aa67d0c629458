//! Intermediate representation produced by the emitters.
//!
//! Every statement has a value and every [`Block`] yields the value of its
//! last statement (unit when empty). Function bodies return their block
//! value and a conditional yields the value of whichever branch ran, so no
//! reserved result binding is needed.

use crate::language::syntax::{BinaryOp, CompareOp};
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub body: Block,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Assign { target: String, value: Expr },
    /// A call in statement position. Its result is still the block value
    /// when it is the last statement.
    Call { callee: String, args: Vec<Expr> },
    Expr(Expr),
    FunctionDef(FunctionDef),
    Conditional {
        cond: Expr,
        then_block: Block,
        else_block: Block,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    List(Vec<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call { callee: String, args: Vec<Expr> },
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, &self.body, 0)
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
    for stmt in &block.stmts {
        write_stmt(f, stmt, depth)?;
    }
    Ok(())
}

fn write_stmt(f: &mut fmt::Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    match stmt {
        Stmt::Assign { target, value } => writeln!(f, "{pad}{target} := {value}"),
        Stmt::Call { callee, args } => writeln!(f, "{pad}{}", Call(callee, args)),
        Stmt::Expr(expr) => writeln!(f, "{pad}{expr}"),
        Stmt::FunctionDef(def) => {
            writeln!(f, "{pad}def {}({}):", def.name, def.params.join(", "))?;
            write_block(f, &def.body, depth + 1)
        }
        Stmt::Conditional {
            cond,
            then_block,
            else_block,
        } => {
            writeln!(f, "{pad}if {cond}:")?;
            write_block(f, then_block, depth + 1)?;
            writeln!(f, "{pad}else:")?;
            write_block(f, else_block, depth + 1)
        }
    }
}

struct Call<'a>(&'a str, &'a [Expr]);

impl fmt::Display for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.0)?;
        write_list(f, self.1)?;
        write!(f, ")")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(value) => write!(f, "{value}"),
            Expr::Float(value) => write!(f, "{value:?}"),
            Expr::Str(value) => write!(f, "{value:?}"),
            Expr::Name(name) => write!(f, "{name}"),
            Expr::List(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::Compare { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::Call { callee, args } => write!(f, "{}", Call(callee, args)),
        }
    }
}
