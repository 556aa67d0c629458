//! Names the host supplies to every program. They are bound as callables in
//! the compile-time scope and as values in the global environment.

use crate::language::syntax::{BinaryOp, CompareOp};
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::{binary, compare, Value},
};
use std::io::Write;

/// Longest list `range` will build.
const MAX_RANGE_LEN: i128 = 10_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Neg,
    Abs,
    Min,
    Max,
    Sum,
    Len,
    Range,
    Int,
    Float,
    Str,
    Not,
}

impl Builtin {
    pub const ALL: [Builtin; 18] = [
        Builtin::Print,
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::Mod,
        Builtin::Pow,
        Builtin::Neg,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Sum,
        Builtin::Len,
        Builtin::Range,
        Builtin::Int,
        Builtin::Float,
        Builtin::Str,
        Builtin::Not,
    ];

    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::ALL.into_iter().map(Builtin::name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Add => "add",
            Builtin::Sub => "sub",
            Builtin::Mul => "mul",
            Builtin::Div => "div",
            Builtin::Mod => "mod",
            Builtin::Pow => "pow",
            Builtin::Neg => "neg",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Not => "not",
        }
    }

    pub fn call(self, args: Vec<Value>, out: &mut dyn Write) -> RuntimeResult<Value> {
        match self {
            Builtin::Print => {
                let line: Vec<String> = args.iter().map(Value::to_string).collect();
                writeln!(out, "{}", line.join(" "))?;
                Ok(Value::Unit)
            }
            Builtin::Add => self.fold(args, BinaryOp::Add),
            Builtin::Mul => self.fold(args, BinaryOp::Mul),
            Builtin::Sub => self.pair(args, BinaryOp::Sub),
            Builtin::Div => self.pair(args, BinaryOp::Div),
            Builtin::Mod => self.pair(args, BinaryOp::Rem),
            Builtin::Pow => {
                let [base, exp] = self.exactly(args)?;
                pow(&base, &exp)
            }
            Builtin::Neg => {
                let [value] = self.exactly(args)?;
                binary(BinaryOp::Sub, &Value::Int(0), &value)
            }
            Builtin::Abs => match self.exactly(args)? {
                [Value::Int(v)] => v.checked_abs().map(Value::Int).ok_or_else(|| {
                    RuntimeError::IntegerOverflow {
                        operation: format!("abs {v}"),
                    }
                }),
                [Value::Float(v)] => Ok(Value::Float(v.abs())),
                [other] => Err(self.expects_number(&other)),
            },
            Builtin::Min | Builtin::Max => {
                let op = if self == Builtin::Min {
                    CompareOp::Lt
                } else {
                    CompareOp::Gt
                };
                let mut best: Option<Value> = None;
                for item in self.spread(args) {
                    best = Some(match best {
                        Some(current) if !compare(op, &item, &current)?.as_bool() => current,
                        _ => item,
                    });
                }
                best.ok_or_else(|| RuntimeError::invalid_argument(self.name(), "no values given"))
            }
            Builtin::Sum => {
                let items = self.spread(args);
                items
                    .iter()
                    .try_fold(Value::Int(0), |acc, item| binary(BinaryOp::Add, &acc, item))
            }
            Builtin::Len => match self.exactly(args)? {
                [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
                [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
                [other] => Err(RuntimeError::type_mismatch(format!(
                    "`len` expects a string or list, got {}",
                    other.type_name()
                ))),
            },
            Builtin::Range => {
                let (start, end) = match args.as_slice() {
                    [Value::Int(end)] => (0, *end),
                    [Value::Int(start), Value::Int(end)] => (*start, *end),
                    _ => {
                        return Err(RuntimeError::invalid_argument(
                            self.name(),
                            "expected one or two integers",
                        ))
                    }
                };
                let len = (i128::from(end) - i128::from(start)).max(0);
                if len > MAX_RANGE_LEN {
                    return Err(RuntimeError::invalid_argument(
                        self.name(),
                        format!("{start}..{end} has more than {MAX_RANGE_LEN} elements"),
                    ));
                }
                Ok(Value::list((start..end).map(Value::Int).collect()))
            }
            Builtin::Int => match self.exactly(args)? {
                [Value::Int(v)] => Ok(Value::Int(v)),
                [Value::Bool(v)] => Ok(Value::Int(i64::from(v))),
                [Value::Float(v)] => {
                    let truncated = v.trunc();
                    if truncated.is_finite()
                        && truncated >= i64::MIN as f64
                        && truncated < i64::MAX as f64
                    {
                        Ok(Value::Int(truncated as i64))
                    } else {
                        Err(RuntimeError::invalid_argument(
                            self.name(),
                            format!("{v} does not fit in an integer"),
                        ))
                    }
                }
                [Value::Str(s)] => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    RuntimeError::invalid_argument(self.name(), format!("`{s}` is not an integer"))
                }),
                [other] => Err(self.expects_number(&other)),
            },
            Builtin::Float => match self.exactly(args)? {
                [Value::Str(s)] => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    RuntimeError::invalid_argument(self.name(), format!("`{s}` is not a number"))
                }),
                [other] => other
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| self.expects_number(&other)),
            },
            Builtin::Str => {
                let [value] = self.exactly(args)?;
                Ok(Value::str(&value.to_string()))
            }
            Builtin::Not => {
                let [value] = self.exactly(args)?;
                Ok(Value::Bool(!value.as_bool()))
            }
        }
    }

    fn exactly<const N: usize>(self, args: Vec<Value>) -> RuntimeResult<[Value; N]> {
        let received = args.len();
        args.try_into().map_err(|_| RuntimeError::ArityMismatch {
            name: self.name().to_string(),
            expected: N.to_string(),
            received,
        })
    }

    /// Left fold over at least one argument.
    fn fold(self, args: Vec<Value>, op: BinaryOp) -> RuntimeResult<Value> {
        let mut args = args.into_iter();
        let first = args.next().ok_or_else(|| RuntimeError::ArityMismatch {
            name: self.name().to_string(),
            expected: "at least 1".to_string(),
            received: 0,
        })?;
        args.try_fold(first, |acc, item| binary(op, &acc, &item))
    }

    fn pair(self, args: Vec<Value>, op: BinaryOp) -> RuntimeResult<Value> {
        let [lhs, rhs] = self.exactly(args)?;
        binary(op, &lhs, &rhs)
    }

    /// A single list argument stands for its elements.
    fn spread(self, args: Vec<Value>) -> Vec<Value> {
        if let [Value::List(items)] = args.as_slice() {
            return items.as_ref().clone();
        }
        args
    }

    fn expects_number(self, value: &Value) -> RuntimeError {
        RuntimeError::type_mismatch(format!(
            "`{}` expects a number, got {}",
            self.name(),
            value.type_name()
        ))
    }
}

fn pow(base: &Value, exp: &Value) -> RuntimeResult<Value> {
    match (base, exp) {
        (Value::Int(b), Value::Int(e)) if *e >= 0 => match (*b, u32::try_from(*e)) {
            (b, Ok(e)) => b.checked_pow(e),
            (0 | 1, Err(_)) => Some(*b),
            (-1, Err(_)) => Some(if e % 2 == 0 { 1 } else { -1 }),
            (_, Err(_)) => None,
        }
        .map(Value::Int)
        .ok_or_else(|| RuntimeError::IntegerOverflow {
            operation: format!("{b} pow {e}"),
        }),
        _ => match (base.as_f64(), exp.as_f64()) {
            (Some(b), Some(e)) => Ok(Value::Float(b.powf(e))),
            _ => Err(RuntimeError::type_mismatch(format!(
                "`pow` expects numbers, got {} and {}",
                base.type_name(),
                exp.type_name()
            ))),
        },
    }
}
