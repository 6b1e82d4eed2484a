//! Cross-boundary contracts for the planning engine: typed scalar values,
//! predicate operators, asset spec types, and configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod assets;
pub mod config;

/// Ticks per simulated day; the hour-of-day sensor reads ticks modulo this.
pub const TICKS_PER_DAY: u64 = 24;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A typed scalar observation or literal.
///
/// Sensors read `Value`s, properties project them out of state, and comparison
/// conditions match them against literals. 32-bit integer readings widen to
/// `I64` at the sensor boundary; there is no other implicit coercion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    I64(i64),
    F64(f64),
}

impl Value {
    /// The variant name, used in type-mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I64(_) => "i64",
            Value::F64(_) => "f64",
        }
    }

    /// Numeric view of the value. `Bool` has no numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(_) => None,
            Value::I64(value) => Some(*value as f64),
            Value::F64(value) => Some(*value),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Apply a comparison operator across two values of the same variant.
    ///
    /// Returns `None` when the variants differ: the caller decides whether a
    /// mismatch degrades to `false` or surfaces as an error. `F64` equality is
    /// exact; callers tolerating float imprecision should construct `Lte`/`Gte`
    /// conditions instead.
    pub fn compare(op: PredicateOp, left: &Value, right: &Value) -> Option<bool> {
        match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Some(op.eval(a, b)),
            (Value::I64(a), Value::I64(b)) => Some(op.eval(a, b)),
            (Value::F64(a), Value::F64(b)) => Some(op.eval(a, b)),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I64(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{}", value),
            Value::I64(value) => write!(f, "{}", value),
            Value::F64(value) => write!(f, "{}", value),
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Comparison operator applied as `left op right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl PredicateOp {
    pub fn eval<T: PartialOrd>(self, left: &T, right: &T) -> bool {
        match self {
            PredicateOp::Eq => left == right,
            PredicateOp::Neq => left != right,
            PredicateOp::Lt => left < right,
            PredicateOp::Lte => left <= right,
            PredicateOp::Gt => left > right,
            PredicateOp::Gte => left >= right,
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            PredicateOp::Eq => "==",
            PredicateOp::Neq => "!=",
            PredicateOp::Lt => "<",
            PredicateOp::Lte => "<=",
            PredicateOp::Gt => ">",
            PredicateOp::Gte => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// Boolean combinator over two property readings interpreted as truthy (> 0).
/// `Not` applies to the left operand only; the right operand is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
    Not,
    Xor,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
            LogicalOp::Xor => "XOR",
        };
        write!(f, "{}", name)
    }
}
