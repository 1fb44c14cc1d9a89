//! One-dimensional intervals with open/closed endpoints.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{RecordId, value::Value};

/// The range of values a record constrains or offers for one attribute.
///
/// `open_lower`/`open_upper` select between `(`/`[` and `)`/`]`. The default range is
/// `(-inf, +inf)`. In serialized form an unbounded endpoint is written as `null`
/// (or omitted), since JSON has no infinities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub key: RecordId,
    #[serde(with = "lower_bound", default = "neg_infinity")]
    pub lower: Value,
    #[serde(with = "upper_bound", default = "infinity")]
    pub upper: Value,
    #[serde(default = "open_default")]
    pub open_lower: bool,
    #[serde(default = "open_default")]
    pub open_upper: bool,
}

impl Interval {
    pub fn new(
        key: RecordId,
        lower: impl Into<Value>,
        open_lower: bool,
        upper: impl Into<Value>,
        open_upper: bool,
    ) -> Interval {
        Interval {
            key,
            lower: lower.into(),
            upper: upper.into(),
            open_lower,
            open_upper,
        }
    }

    /// `(-inf, +inf)`
    pub fn unbounded(key: RecordId) -> Interval {
        Interval::new(key, Value::NEG_INFINITY, true, Value::INFINITY, true)
    }

    /// `[lower, upper]`
    pub fn closed(key: RecordId, lower: impl Into<Value>, upper: impl Into<Value>) -> Interval {
        Interval::new(key, lower, false, upper, false)
    }

    /// `[value, value]`
    pub fn point(key: RecordId, value: impl Into<Value>) -> Interval {
        let value = value.into();
        Interval::new(key, value.clone(), false, value, false)
    }

    /// Returns a copy of this interval registered under another key.
    pub fn with_key(&self, key: RecordId) -> Interval {
        Interval {
            key,
            ..self.clone()
        }
    }

    pub fn is_point(&self) -> bool {
        !self.open_lower
            && !self.open_upper
            && self.lower.compare(&self.upper) == Some(Ordering::Equal)
    }

    /// Returns `true` when no value lies inside the interval, including the case of
    /// endpoints that cannot be compared with each other.
    pub fn is_empty(&self) -> bool {
        !range_is_nonempty(&self.lower, self.open_lower, &self.upper, self.open_upper)
    }

    /// Returns `true` when `value` lies inside the interval.
    pub fn contains(&self, value: &Value) -> bool {
        intersects(
            (&self.lower, self.open_lower),
            (&self.upper, self.open_upper),
            (value, false),
            (value, false),
        )
    }

    /// Returns `true` when the two intervals share at least one value.
    pub fn overlaps(&self, other: &Interval) -> bool {
        intersects(
            (&self.lower, self.open_lower),
            (&self.upper, self.open_upper),
            (&other.lower, other.open_lower),
            (&other.upper, other.open_upper),
        )
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.open_lower { '(' } else { '[' },
            self.lower,
            self.upper,
            if self.open_upper { ')' } else { ']' }
        )
    }
}

/// Tests whether the intersection of the ranges `a` and `b` contains a value.
///
/// Each range is given as `(lower, open)` / `(upper, open)` pairs. The tighter of the
/// two lower bounds is compared against the tighter of the two upper bounds; equal
/// values intersect only when both of the deciding bounds are closed.
pub(crate) fn intersects<T: PartialOrd + ?Sized>(
    a_lower: (&T, bool),
    a_upper: (&T, bool),
    b_lower: (&T, bool),
    b_upper: (&T, bool),
) -> bool {
    let lower = tighter_lower(a_lower, b_lower);
    let upper = tighter_upper(a_upper, b_upper);
    let (Some(lower), Some(upper)) = (lower, upper) else {
        return false;
    };
    range_is_nonempty(lower.0, lower.1, upper.0, upper.1)
}

pub(crate) fn range_is_nonempty<T: PartialOrd + ?Sized>(
    lower: &T,
    open_lower: bool,
    upper: &T,
    open_upper: bool,
) -> bool {
    match lower.partial_cmp(upper) {
        Some(Ordering::Less) => true,
        Some(Ordering::Equal) => !open_lower && !open_upper,
        _ => false,
    }
}

fn tighter_lower<'a, T: PartialOrd + ?Sized>(
    a: (&'a T, bool),
    b: (&'a T, bool),
) -> Option<(&'a T, bool)> {
    Some(match a.0.partial_cmp(b.0)? {
        Ordering::Less => b,
        Ordering::Greater => a,
        Ordering::Equal => (a.0, a.1 || b.1),
    })
}

fn tighter_upper<'a, T: PartialOrd + ?Sized>(
    a: (&'a T, bool),
    b: (&'a T, bool),
) -> Option<(&'a T, bool)> {
    Some(match a.0.partial_cmp(b.0)? {
        Ordering::Less => a,
        Ordering::Greater => b,
        Ordering::Equal => (a.0, a.1 || b.1),
    })
}

fn neg_infinity() -> Value {
    Value::NEG_INFINITY
}

fn infinity() -> Value {
    Value::INFINITY
}

fn open_default() -> bool {
    true
}

macro_rules! bound_serde {
    ($name:ident, $sentinel:expr) => {
        mod $name {
            use serde::{Deserialize, Deserializer, Serialize, Serializer};

            use crate::value::Value;

            pub fn serialize<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
                if value.is_unbounded() {
                    serializer.serialize_none()
                } else {
                    value.serialize(serializer)
                }
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
                Ok(Option::<Value>::deserialize(deserializer)?.unwrap_or($sentinel))
            }
        }
    };
}

bound_serde!(lower_bound, Value::NEG_INFINITY);
bound_serde!(upper_bound, Value::INFINITY);
