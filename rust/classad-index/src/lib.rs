//! Per-attribute constraint indexes.
//!
//! Every attribute of a population of rectangles gets one [`ClassAdIndex`], chosen by
//! the type prefix of the attribute name (see [`AttributeKind`]):
//!
//! - numeric attributes are kept in an [`IntervalTree`] answering window queries,
//! - string attributes in a [`StringIndex`] grouping keys by value,
//! - boolean attributes in a [`BooleanIndex`] of two membership sets.
//!
//! All variants share the same contract: [`ClassAdIndex::delete`],
//! [`ClassAdIndex::filter`] and [`ClassAdIndex::filter_all`], reporting matching
//! record keys into a [`KeySet`].

use std::collections::BTreeMap;
use std::fmt;

use classad_common::Result;
use classad_keyset::KeySet;

pub mod attribute;
pub mod boolean;
pub mod interval;
pub mod interval_tree;
pub mod string;
pub mod value;

#[cfg(test)]
mod tests;

pub use attribute::AttributeKind;
pub use boolean::BooleanIndex;
pub use interval::Interval;
pub use interval_tree::IntervalTree;
pub use string::StringIndex;
pub use value::Value;

/// Identifier of an indexed record.
pub type RecordId = classad_keyset::Key;

/// The intervals of one attribute, by record.
pub type Dimension = BTreeMap<RecordId, Interval>;

/// An index over the values of one attribute.
#[derive(Clone)]
pub enum ClassAdIndex {
    Numeric(IntervalTree),
    String(StringIndex),
    Boolean(BooleanIndex),
}

impl ClassAdIndex {
    /// Builds the index variant selected by the prefix of `attribute`.
    ///
    /// # Errors
    ///
    /// `UnknownAttributeType` for an unrecognized prefix, `InvalidFormat` when an
    /// interval does not fit the selected variant.
    pub fn make(attribute: &str, dimension: &Dimension) -> Result<ClassAdIndex> {
        Ok(match AttributeKind::from_attribute_name(attribute)? {
            AttributeKind::Numeric => ClassAdIndex::Numeric(IntervalTree::make(dimension)?),
            AttributeKind::String => ClassAdIndex::String(StringIndex::make(dimension)?),
            AttributeKind::Boolean => ClassAdIndex::Boolean(BooleanIndex::make(dimension)?),
        })
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            ClassAdIndex::Numeric(_) => AttributeKind::Numeric,
            ClassAdIndex::String(_) => AttributeKind::String,
            ClassAdIndex::Boolean(_) => AttributeKind::Boolean,
        }
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        match self {
            ClassAdIndex::Numeric(tree) => tree.len(),
            ClassAdIndex::String(index) => index.len(),
            ClassAdIndex::Boolean(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes `key`, registered with `interval`. `Ok(false)` if it is not indexed.
    pub fn delete(&mut self, key: RecordId, interval: &Interval) -> Result<bool> {
        match self {
            ClassAdIndex::Numeric(tree) => tree.delete(key, interval),
            ClassAdIndex::String(index) => index.delete(key, interval),
            ClassAdIndex::Boolean(index) => index.delete(key, interval),
        }
    }

    /// Adds to `result` every key whose interval overlaps `query`. `Ok(false)` when
    /// the query cannot be interpreted by this variant.
    pub fn filter(&self, query: &Interval, result: &mut KeySet) -> Result<bool> {
        match self {
            ClassAdIndex::Numeric(tree) => tree.window_query(query, result),
            ClassAdIndex::String(index) => index.filter(query, result),
            ClassAdIndex::Boolean(index) => index.filter(query, result),
        }
    }

    /// Adds to `result` every indexed key whose interval admits some value.
    pub fn filter_all(&self, result: &mut KeySet) -> Result<bool> {
        match self {
            ClassAdIndex::Numeric(tree) => {
                let everything = Interval::closed(0, Value::NEG_INFINITY, Value::INFINITY);
                tree.window_query(&everything, result)
            }
            ClassAdIndex::String(index) => index.filter_all(result),
            ClassAdIndex::Boolean(index) => index.filter_all(result),
        }
    }
}

impl fmt::Display for ClassAdIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassAdIndex::Numeric(tree) => fmt::Display::fmt(tree, f),
            ClassAdIndex::String(index) => fmt::Display::fmt(index, f),
            ClassAdIndex::Boolean(index) => fmt::Display::fmt(index, f),
        }
    }
}
