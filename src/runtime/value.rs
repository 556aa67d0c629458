use crate::language::syntax::{BinaryOp, CompareOp};
use crate::runtime::{
    builtins::Builtin,
    bytecode::FunctionProto,
    environment::EnvId,
    error::{RuntimeError, RuntimeResult},
};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Value {
    Unit,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Function(Rc<Closure>),
    Builtin(Builtin),
}

/// A user definition together with the environment it was defined in.
pub struct Closure {
    pub proto: Rc<FunctionProto>,
    pub env: EnvId,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.proto.name)
            .field("params", &self.proto.params)
            .finish()
    }
}

impl Value {
    pub fn str(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Unit => false,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Bool(v) => *v,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (idx, value) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Function(closure) => write!(f, "<function {}>", closure.proto.name),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}

/// `+ - * / %` on runtime values.
///
/// Integer arithmetic is checked. `/` always divides as floats and `%` takes
/// the sign of the divisor.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            Ok(Value::Str(Rc::from(format!("{a}{b}"))))
        }
        (Value::List(a), Value::List(b)) if op == BinaryOp::Add => {
            let mut items = Vec::with_capacity(a.len() + b.len());
            items.extend(a.iter().cloned());
            items.extend(b.iter().cloned());
            Ok(Value::list(items))
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => float_arith(op, a, b),
            _ => Err(RuntimeError::type_mismatch(format!(
                "cannot apply `{op}` to {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
    }
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> RuntimeResult<Value> {
    let overflow = || RuntimeError::IntegerOverflow {
        operation: format!("{a} {op} {b}"),
    };
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Div => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::Rem => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            let rem = a.checked_rem(b).ok_or_else(overflow)?;
            if rem != 0 && (rem < 0) != (b < 0) {
                Ok(Value::Int(rem + b))
            } else {
                Ok(Value::Int(rem))
            }
        }
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> RuntimeResult<Value> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::Rem => {
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            let rem = a % b;
            if rem != 0.0 && (rem < 0.0) != (b < 0.0) {
                rem + b
            } else {
                rem
            }
        }
    };
    Ok(Value::Float(value))
}

/// `< > <= >= ==`. Equality works on every value; ordering only on numbers
/// and on strings.
pub fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    if op == CompareOp::EqEq {
        return Ok(Value::Bool(lhs == rhs));
    }
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(RuntimeError::type_mismatch(format!(
                    "cannot compare {} with {} using `{op}`",
                    lhs.type_name(),
                    rhs.type_name()
                )))
            }
        },
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
        CompareOp::EqEq => ordering == Ordering::Equal,
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_stays_integral_except_division() {
        assert_eq!(binary(BinaryOp::Add, &Value::Int(2), &Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(binary(BinaryOp::Div, &Value::Int(7), &Value::Int(2)), Ok(Value::Float(3.5)));
        assert_eq!(binary(BinaryOp::Mul, &Value::Int(2), &Value::Float(1.5)), Ok(Value::Float(3.0)));
    }

    #[test]
    fn remainder_follows_the_divisor_sign() {
        assert_eq!(binary(BinaryOp::Rem, &Value::Int(-7), &Value::Int(3)), Ok(Value::Int(2)));
        assert_eq!(binary(BinaryOp::Rem, &Value::Int(7), &Value::Int(-3)), Ok(Value::Int(-2)));
        assert_eq!(
            binary(BinaryOp::Rem, &Value::Float(-1.5), &Value::Float(1.0)),
            Ok(Value::Float(0.5))
        );
    }

    #[test]
    fn arithmetic_failures_are_reported() {
        assert_eq!(
            binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0)),
            Err(RuntimeError::DivisionByZero)
        );
        assert!(matches!(
            binary(BinaryOp::Add, &Value::Int(i64::MAX), &Value::Int(1)),
            Err(RuntimeError::IntegerOverflow { .. })
        ));
        assert!(matches!(
            binary(BinaryOp::Sub, &Value::str("a"), &Value::Int(1)),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn strings_and_lists_concatenate() {
        assert_eq!(
            binary(BinaryOp::Add, &Value::str("ab"), &Value::str("cd")),
            Ok(Value::str("abcd"))
        );
        let joined = binary(
            BinaryOp::Add,
            &Value::list(vec![Value::Int(1)]),
            &Value::list(vec![Value::Int(2)]),
        );
        assert_eq!(joined, Ok(Value::list(vec![Value::Int(1), Value::Int(2)])));
    }

    #[test]
    fn comparisons_mix_numeric_types() {
        assert_eq!(compare(CompareOp::Lt, &Value::Int(1), &Value::Float(1.5)), Ok(Value::Bool(true)));
        assert_eq!(compare(CompareOp::GtEq, &Value::Int(2), &Value::Int(2)), Ok(Value::Bool(true)));
        assert_eq!(compare(CompareOp::EqEq, &Value::Int(2), &Value::Float(2.0)), Ok(Value::Bool(true)));
        assert_eq!(compare(CompareOp::EqEq, &Value::str("a"), &Value::Int(1)), Ok(Value::Bool(false)));
        assert!(compare(CompareOp::Lt, &Value::str("a"), &Value::Int(1)).is_err());
    }

    #[test]
    fn floats_always_print_a_fraction() {
        assert_eq!(Value::Float(25164150.0).to_string(), "25164150.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::str("x")]).to_string(),
            "[1, x]"
        );
    }
}
