//! Flat instruction listings lowered from the IR.
//!
//! Every statement leaves exactly one value on the operand stack; the value
//! of a block is whatever its last statement left. Jumps use absolute
//! instruction indices within their chunk.

use crate::language::{
    ir::{Block, Expr, FunctionDef, Program, Stmt},
    syntax::{BinaryOp, CompareOp},
};
use crate::runtime::value::Value;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Instruction {
    Const(Value),
    Load(String),
    /// Binds the top of the stack in the current environment, leaving it in
    /// place.
    Store(String),
    BuildList(usize),
    Binary(BinaryOp),
    Compare(CompareOp),
    Call { callee: String, argc: usize },
    Closure(Rc<FunctionProto>),
    JumpIfFalse(usize),
    Jump(usize),
    Pop,
    Return,
}

#[derive(Clone, Debug, Default)]
pub struct Chunk {
    pub instructions: Vec<Instruction>,
}

#[derive(Debug)]
pub struct FunctionProto {
    pub name: String,
    pub params: Vec<String>,
    pub chunk: Rc<Chunk>,
}

pub fn lower(program: &Program) -> Chunk {
    let mut code = Vec::new();
    lower_block(&program.body, &mut code);
    code.push(Instruction::Return);
    Chunk { instructions: code }
}

fn lower_function(def: &FunctionDef) -> FunctionProto {
    let mut code = Vec::new();
    lower_block(&def.body, &mut code);
    code.push(Instruction::Return);
    FunctionProto {
        name: def.name.clone(),
        params: def.params.clone(),
        chunk: Rc::new(Chunk { instructions: code }),
    }
}

fn lower_block(block: &Block, code: &mut Vec<Instruction>) {
    if block.is_empty() {
        code.push(Instruction::Const(Value::Unit));
        return;
    }
    for (idx, stmt) in block.stmts.iter().enumerate() {
        if idx > 0 {
            code.push(Instruction::Pop);
        }
        lower_stmt(stmt, code);
    }
}

fn lower_stmt(stmt: &Stmt, code: &mut Vec<Instruction>) {
    match stmt {
        Stmt::Assign { target, value } => {
            lower_expr(value, code);
            code.push(Instruction::Store(target.clone()));
        }
        Stmt::Call { callee, args } => lower_call(callee, args, code),
        Stmt::Expr(expr) => lower_expr(expr, code),
        Stmt::FunctionDef(def) => {
            code.push(Instruction::Closure(Rc::new(lower_function(def))));
            code.push(Instruction::Store(def.name.clone()));
        }
        Stmt::Conditional {
            cond,
            then_block,
            else_block,
        } => {
            lower_expr(cond, code);
            let jump_if_false_pos = code.len();
            code.push(Instruction::JumpIfFalse(0));
            lower_block(then_block, code);
            let jump_pos = code.len();
            code.push(Instruction::Jump(0));
            let else_start = code.len();
            code[jump_if_false_pos] = Instruction::JumpIfFalse(else_start);
            lower_block(else_block, code);
            let end = code.len();
            code[jump_pos] = Instruction::Jump(end);
        }
    }
}

fn lower_call(callee: &str, args: &[Expr], code: &mut Vec<Instruction>) {
    for arg in args {
        lower_expr(arg, code);
    }
    code.push(Instruction::Call {
        callee: callee.to_string(),
        argc: args.len(),
    });
}

fn lower_expr(expr: &Expr, code: &mut Vec<Instruction>) {
    match expr {
        Expr::Int(value) => code.push(Instruction::Const(Value::Int(*value))),
        Expr::Float(value) => code.push(Instruction::Const(Value::Float(*value))),
        Expr::Str(value) => code.push(Instruction::Const(Value::str(value))),
        Expr::Name(name) => code.push(Instruction::Load(name.clone())),
        Expr::List(items) => {
            for item in items {
                lower_expr(item, code);
            }
            code.push(Instruction::BuildList(items.len()));
        }
        Expr::Binary { op, lhs, rhs } => {
            lower_expr(lhs, code);
            lower_expr(rhs, code);
            code.push(Instruction::Binary(*op));
        }
        Expr::Compare { op, lhs, rhs } => {
            lower_expr(lhs, code);
            lower_expr(rhs, code);
            code.push(Instruction::Compare(*op));
        }
        Expr::Call { callee, args } => lower_call(callee, args, code),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Const(Value::Str(value)) => write!(f, "const {:?}", value.as_ref()),
            Instruction::Const(value) => write!(f, "const {value}"),
            Instruction::Load(name) => write!(f, "load {name}"),
            Instruction::Store(name) => write!(f, "store {name}"),
            Instruction::BuildList(len) => write!(f, "list {len}"),
            Instruction::Binary(op) => write!(f, "binary {op}"),
            Instruction::Compare(op) => write!(f, "compare {op}"),
            Instruction::Call { callee, argc } => write!(f, "call {callee} {argc}"),
            Instruction::Closure(proto) => write!(f, "closure {}", proto.name),
            Instruction::JumpIfFalse(target) => write!(f, "jump_if_false {target}"),
            Instruction::Jump(target) => write!(f, "jump {target}"),
            Instruction::Pop => write!(f, "pop"),
            Instruction::Return => write!(f, "return"),
        }
    }
}

/// Lists the chunk followed by every function it defines, nested ones
/// included.
impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chunk(f, "<main>", self)
    }
}

fn write_chunk(f: &mut fmt::Formatter<'_>, name: &str, chunk: &Chunk) -> fmt::Result {
    writeln!(f, "== {name} ==")?;
    for (idx, instruction) in chunk.instructions.iter().enumerate() {
        writeln!(f, "{idx:04} {instruction}")?;
    }
    for instruction in &chunk.instructions {
        if let Instruction::Closure(proto) = instruction {
            write_chunk(f, &proto.name, &proto.chunk)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(chunk: &Chunk) -> Vec<String> {
        chunk.instructions.iter().map(ToString::to_string).collect()
    }

    fn call(callee: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            callee: callee.to_string(),
            args,
        }
    }

    #[test]
    fn statements_are_separated_by_pops() {
        let program = Program {
            body: Block::new(vec![
                Stmt::Assign {
                    target: "x".into(),
                    value: Expr::Int(1),
                },
                Stmt::Call {
                    callee: "print".into(),
                    args: vec![Expr::Name("x".into())],
                },
            ]),
        };
        assert_eq!(
            listing(&lower(&program)),
            vec!["const 1", "store x", "pop", "load x", "call print 1", "return"]
        );
    }

    #[test]
    fn empty_program_yields_unit() {
        let chunk = lower(&Program::default());
        assert_eq!(listing(&chunk), vec!["const ()", "return"]);
    }

    #[test]
    fn conditionals_patch_both_jumps() {
        let program = Program {
            body: Block::new(vec![Stmt::Conditional {
                cond: Expr::Compare {
                    op: CompareOp::Lt,
                    lhs: Box::new(Expr::Name("n".into())),
                    rhs: Box::new(Expr::Int(2)),
                },
                then_block: Block::new(vec![Stmt::Expr(Expr::Name("n".into()))]),
                else_block: Block::default(),
            }]),
        };
        assert_eq!(
            listing(&lower(&program)),
            vec![
                "load n",
                "const 2",
                "compare <",
                "jump_if_false 6",
                "load n",
                "jump 7",
                "const ()",
                "return",
            ]
        );
    }

    #[test]
    fn definitions_lower_into_their_own_chunk() {
        let program = Program {
            body: Block::new(vec![Stmt::FunctionDef(FunctionDef {
                name: "twice".into(),
                params: vec!["x".into()],
                body: Block::new(vec![Stmt::Expr(call(
                    "add",
                    vec![Expr::Name("x".into()), Expr::Name("x".into())],
                ))]),
            })]),
        };
        let chunk = lower(&program);
        assert_eq!(listing(&chunk), vec!["closure twice", "store twice", "return"]);
        let Instruction::Closure(proto) = &chunk.instructions[0] else {
            panic!("expected a closure instruction");
        };
        assert_eq!(proto.params, vec!["x".to_string()]);
        assert_eq!(
            listing(&proto.chunk),
            vec!["load x", "load x", "call add 2", "return"]
        );
        let dump = chunk.to_string();
        assert!(dump.contains("== <main> =="));
        assert!(dump.contains("== twice =="));
        assert!(dump.contains("0002 call add 2"));
    }
}
