//! Index over boolean-valued attributes: two membership sets.

use std::fmt;

use classad_common::{Result, error::Error, verify_data};
use classad_keyset::KeySet;

use crate::{Dimension, RecordId, interval::Interval, value::Value};

/// Partitions record keys by the truth values their interval admits. An interval
/// admitting both values (`[false, true]`, or unbounded) is in both sets.
#[derive(Clone, Default)]
pub struct BooleanIndex {
    /// Keys whose interval contains `true`.
    yup: KeySet,
    /// Keys whose interval contains `false`.
    nope: KeySet,
    members: KeySet,
}

impl BooleanIndex {
    pub fn make(dimension: &Dimension) -> Result<BooleanIndex> {
        let mut index = BooleanIndex::default();
        for (&key, interval) in dimension {
            verify_data!(interval_key, interval.key == key);
            let (admits_true, admits_false) = truth_table(interval).ok_or_else(|| {
                Error::invalid_format(
                    format!("interval of record {key}"),
                    format!("{interval} does not have boolean endpoints"),
                )
            })?;
            if admits_true {
                index.yup.insert(key);
            }
            if admits_false {
                index.nope.insert(key);
            }
            index.members.insert(key);
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.members.count()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn yup(&self) -> &KeySet {
        &self.yup
    }

    pub fn nope(&self) -> &KeySet {
        &self.nope
    }

    /// Removes `key` if it was indexed with the truth values `interval` admits.
    /// Returns `Ok(false)` otherwise, leaving the index unchanged.
    pub fn delete(&mut self, key: RecordId, interval: &Interval) -> Result<bool> {
        let Some(admits) = truth_table(interval) else {
            return Ok(false);
        };
        if !self.members.contains(key) || admits != (self.yup.contains(key), self.nope.contains(key))
        {
            return Ok(false);
        }
        self.members.remove(key);
        self.yup.remove(key);
        self.nope.remove(key);
        Ok(true)
    }

    /// Adds the keys admitting any truth value the query admits. Returns `false` when
    /// the query endpoints are neither booleans nor unbounded.
    pub fn filter(&self, query: &Interval, result: &mut KeySet) -> Result<bool> {
        let Some((query_true, query_false)) = truth_table(query) else {
            return Ok(false);
        };
        if query_true {
            result.union_with(&self.yup);
        }
        if query_false {
            result.union_with(&self.nope);
        }
        Ok(true)
    }

    pub fn filter_all(&self, result: &mut KeySet) -> Result<bool> {
        result.union_with(&self.yup);
        result.union_with(&self.nope);
        Ok(true)
    }
}

impl fmt::Display for BooleanIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "boolean index: {} keys", self.members.count())?;
        writeln!(f, "  true  -> {}", self.yup)?;
        writeln!(f, "  false -> {}", self.nope)
    }
}

/// Decodes an interval into `(admits true, admits false)`.
fn truth_table(interval: &Interval) -> Option<(bool, bool)> {
    let boolean = |value: &Value| value.as_bool().is_some() || value.is_unbounded();
    if !boolean(&interval.lower) || !boolean(&interval.upper) {
        return None;
    }
    Some((
        interval.contains(&Value::Boolean(true)),
        interval.contains(&Value::Boolean(false)),
    ))
}
