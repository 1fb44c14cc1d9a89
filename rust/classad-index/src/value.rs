//! Attribute values as they appear at interval endpoints.

use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// An endpoint value: a number, a string or a boolean.
///
/// `Number(-inf)` and `Number(+inf)` double as the "unbounded" sentinels: they order
/// below (respectively above) every other value of any kind. Apart from those two,
/// values of different kinds are incomparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
}

/// The kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    String,
    Boolean,
}

impl Value {
    pub const NEG_INFINITY: Value = Value::Number(f64::NEG_INFINITY);
    pub const INFINITY: Value = Value::Number(f64::INFINITY);

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Boolean(_) => ValueKind::Boolean,
        }
    }

    /// Returns `true` for the `-inf`/`+inf` sentinels.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_infinite())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Orders two values.
    ///
    /// Numbers order numerically (NaN above everything, as `OrderedFloat` does),
    /// strings lexicographically by bytes, booleans with `false < true`. The infinite
    /// sentinels order against every kind. Any other mix of kinds yields `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Some(OrderedFloat(*a).cmp(&OrderedFloat(*b))),
            (Value::Number(a), _) if a.is_infinite() => Some(if *a < 0.0 {
                Ordering::Less
            } else {
                Ordering::Greater
            }),
            (_, Value::Number(_)) if other.is_unbounded() => {
                other.compare(self).map(Ordering::reverse)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        self.compare(other)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) if n.is_infinite() => {
                write!(f, "{}", if *n < 0.0 { "-inf" } else { "+inf" })
            }
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Boolean(b) => write!(f, "{b}"),
        }
    }
}
