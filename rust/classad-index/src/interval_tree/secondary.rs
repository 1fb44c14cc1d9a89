//! Ordered endpoint lists kept at every tree node.
//!
//! A node stores each of its intervals twice: the lower endpoint in a list sorted by
//! ascending value, the upper endpoint in a list sorted by descending value. At equal
//! values closed endpoints sort before open ones, so a boundary scan can stop at the
//! first entry that fails. Each entry carries the opposite endpoint of its interval.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use ordered_float::OrderedFloat;

use crate::RecordId;

/// One endpoint of a numeric interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bound {
    pub value: f64,
    pub open: bool,
}

impl Bound {
    pub fn new(value: f64, open: bool) -> Bound {
        Bound { value, open }
    }
}

/// Sort key of a list entry.
pub(crate) trait EndpointOrder: Ord + Copy {
    fn new(endpoint: Bound, key: RecordId) -> Self;

    fn endpoint(&self) -> Bound;

    fn key(&self) -> RecordId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Ascending {
    value: OrderedFloat<f64>,
    open: bool,
    key: RecordId,
}

impl EndpointOrder for Ascending {
    fn new(endpoint: Bound, key: RecordId) -> Self {
        Ascending {
            value: OrderedFloat(endpoint.value),
            open: endpoint.open,
            key,
        }
    }

    fn endpoint(&self) -> Bound {
        Bound::new(self.value.0, self.open)
    }

    fn key(&self) -> RecordId {
        self.key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Descending {
    value: Reverse<OrderedFloat<f64>>,
    open: bool,
    key: RecordId,
}

impl EndpointOrder for Descending {
    fn new(endpoint: Bound, key: RecordId) -> Self {
        Descending {
            value: Reverse(OrderedFloat(endpoint.value)),
            open: endpoint.open,
            key,
        }
    }

    fn endpoint(&self) -> Bound {
        Bound::new(self.value.0.0, self.open)
    }

    fn key(&self) -> RecordId {
        self.key
    }
}

/// An ordered multi-map from `(endpoint, key)` to the opposite endpoint.
#[derive(Clone)]
pub(crate) struct SecondaryList<K> {
    entries: BTreeMap<K, Bound>,
}

/// Lower endpoints, ascending.
pub(crate) type LowerList = SecondaryList<Ascending>;

/// Upper endpoints, descending.
pub(crate) type UpperList = SecondaryList<Descending>;

impl<K: EndpointOrder> SecondaryList<K> {
    pub fn new() -> Self {
        SecondaryList {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers an entry. Returns `false` if the same `(endpoint, key)` was present.
    pub fn insert(&mut self, endpoint: Bound, key: RecordId, opposite: Bound) -> bool {
        self.entries.insert(K::new(endpoint, key), opposite).is_none()
    }

    pub fn get(&self, endpoint: Bound, key: RecordId) -> Option<Bound> {
        self.entries.get(&K::new(endpoint, key)).copied()
    }

    pub fn remove(&mut self, endpoint: Bound, key: RecordId) -> Option<Bound> {
        self.entries.remove(&K::new(endpoint, key))
    }

    /// Iterates `(endpoint, key, opposite)` in list order.
    pub fn iter(&self) -> impl Iterator<Item = (Bound, RecordId, Bound)> + '_ {
        self.entries
            .iter()
            .map(|(entry, &opposite)| (entry.endpoint(), entry.key(), opposite))
    }

    pub fn keys(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.entries.keys().map(|entry| entry.key())
    }
}

impl<K: EndpointOrder> fmt::Display for SecondaryList<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (endpoint, key, _)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(
                f,
                "{}{}#{key}",
                endpoint.value,
                if endpoint.open { "o" } else { "c" }
            )?;
        }
        write!(f, "]")
    }
}
