//! Equality index over string-valued attributes.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use classad_common::{Result, error::Error, verify_data};
use classad_keyset::KeySet;

use crate::{Dimension, RecordId, interval::Interval};

/// Groups record keys by their exact string value, in value order.
#[derive(Clone, Default)]
pub struct StringIndex {
    values: BTreeMap<String, KeySet>,
    len: usize,
}

impl StringIndex {
    /// Builds the index from a dimension whose intervals are all single strings
    /// (`["x", "x"]`).
    pub fn make(dimension: &Dimension) -> Result<StringIndex> {
        let mut index = StringIndex::default();
        for (&key, interval) in dimension {
            verify_data!(interval_key, interval.key == key);
            let value = point_string(interval).ok_or_else(|| {
                Error::invalid_format(
                    format!("interval of record {key}"),
                    format!("{interval} is not a single string value"),
                )
            })?;
            index.values.entry(value.to_string()).or_default().insert(key);
            index.len += 1;
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct values.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn delete(&mut self, key: RecordId, interval: &Interval) -> Result<bool> {
        let Some(value) = point_string(interval) else {
            return Ok(false);
        };
        let Some(keys) = self.values.get_mut(value) else {
            return Ok(false);
        };
        if !keys.remove(key) {
            return Ok(false);
        }
        if keys.is_empty() {
            self.values.remove(value);
        }
        self.len -= 1;
        Ok(true)
    }

    /// Adds every key whose value lies within `query`.
    ///
    /// A bound that is not a string is treated as absent, so a query with no string
    /// bounds at all returns every key.
    pub fn filter(&self, query: &Interval, result: &mut KeySet) -> Result<bool> {
        let lower = match query.lower.as_str() {
            Some(s) if query.open_lower => Bound::Excluded(s),
            Some(s) => Bound::Included(s),
            None => Bound::Unbounded,
        };
        let upper = match query.upper.as_str() {
            Some(s) if query.open_upper => Bound::Excluded(s),
            Some(s) => Bound::Included(s),
            None => Bound::Unbounded,
        };
        if is_empty_range(lower, upper) {
            return Ok(true);
        }
        for keys in self.values.range::<str, _>((lower, upper)).map(|(_, keys)| keys) {
            result.union_with(keys);
        }
        Ok(true)
    }

    pub fn filter_all(&self, result: &mut KeySet) -> Result<bool> {
        for keys in self.values.values() {
            result.union_with(keys);
        }
        Ok(true)
    }
}

impl fmt::Display for StringIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "string index: {} keys, {} values",
            self.len,
            self.values.len()
        )?;
        for (value, keys) in &self.values {
            writeln!(f, "  {value:?} -> {keys}")?;
        }
        Ok(())
    }
}

fn point_string(interval: &Interval) -> Option<&str> {
    if interval.is_point() {
        interval.lower.as_str()
    } else {
        None
    }
}

/// `BTreeMap::range` panics on inverted ranges and on `(x, x)`; such windows hold
/// nothing anyway.
fn is_empty_range(lower: Bound<&str>, upper: Bound<&str>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l) | Bound::Excluded(l), Bound::Included(u) | Bound::Excluded(u)) => {
            l >= u
        }
        _ => false,
    }
}
