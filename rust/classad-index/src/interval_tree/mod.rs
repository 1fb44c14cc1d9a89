//! Static augmented interval tree over the numeric endpoints of one attribute.
//!
//! The primary structure is a complete binary tree with one leaf per distinct endpoint
//! value, stored as an arena (`Vec<Node>`, children of node `i` at `2i + 1` and
//! `2i + 2`). Intervals hang off the nodes in two ordered endpoint lists (the
//! "secondary" structure). A third, "tertiary" structure links every active node to
//! the closest active node of each of its subtrees, so queries skip the empty parts of
//! the primary tree.
//!
//! The tree is built once from a complete snapshot ([`IntervalTree::make`]) and can
//! only shrink afterwards ([`IntervalTree::delete`]). Window queries
//! ([`IntervalTree::window_query`]) report every stored interval overlapping the
//! query interval under open/closed endpoint semantics.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use classad_common::{Result, error::Error, verify_data};
use classad_keyset::KeySet;
use itertools::Itertools;
use log::{debug, error};
use ordered_float::OrderedFloat;

use crate::{
    Dimension, RecordId,
    interval::{Interval, intersects, range_is_nonempty},
    value::Value,
};

mod node;
mod secondary;

use node::{Activity, Node};
use secondary::Bound;

/// A numeric interval as stored in the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    lower: Bound,
    upper: Bound,
}

impl Span {
    fn is_empty(&self) -> bool {
        !range_is_nonempty(
            &self.lower.value,
            self.lower.open,
            &self.upper.value,
            self.upper.open,
        )
    }

    fn overlaps(&self, lower: Bound, upper: Bound) -> bool {
        intersects(
            (&self.lower.value, self.lower.open),
            (&self.upper.value, self.upper.open),
            (&lower.value, lower.open),
            (&upper.value, upper.open),
        )
    }

    /// Tests whether the stored interval `(endpoint, opposite)` overlaps this span,
    /// given the endpoint comes from a lower list.
    fn overlaps_lower_entry(&self, endpoint: Bound, opposite: Bound) -> bool {
        self.overlaps(endpoint, opposite)
    }

    /// Same as [`Span::overlaps_lower_entry`] for an upper-list entry.
    fn overlaps_upper_entry(&self, endpoint: Bound, opposite: Bound) -> bool {
        self.overlaps(opposite, endpoint)
    }
}

/// See the module documentation.
#[derive(Clone)]
pub struct IntervalTree {
    nodes: Vec<Node>,
    /// Intervals containing no value at all. They never match a query but are kept so
    /// that deleting them succeeds.
    voids: BTreeMap<RecordId, Span>,
    len: usize,
}

impl IntervalTree {
    /// Builds the tree from every interval of one attribute dimension.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidFormat` when an endpoint is not a number, is NaN, or when an
    /// interval is registered under a key other than its own.
    pub fn make(dimension: &Dimension) -> Result<IntervalTree> {
        let mut spans = Vec::with_capacity(dimension.len());
        let mut voids = BTreeMap::new();
        for (&key, interval) in dimension {
            verify_data!(interval_key, interval.key == key);
            let span = numeric_span(interval).ok_or_else(|| {
                Error::invalid_format(
                    format!("interval of record {key}"),
                    format!("{interval} does not have numeric endpoints"),
                )
            })?;
            if span.is_empty() {
                voids.insert(key, span);
            } else {
                spans.push((key, span));
            }
        }

        let endpoints = spans
            .iter()
            .flat_map(|(_, span)| [OrderedFloat(span.lower.value), OrderedFloat(span.upper.value)])
            .collect::<BTreeSet<_>>();

        let mut tree = IntervalTree {
            nodes: build_primary(&endpoints),
            voids,
            len: dimension.len(),
        };

        for (key, span) in spans {
            let home = tree.home(span).ok_or_else(|| {
                Error::internal(
                    "interval tree construction",
                    format!("no home node for record {key}"),
                )
            })?;
            let node = &mut tree.nodes[home];
            if !node.lower.insert(span.lower, key, span.upper)
                || !node.upper.insert(span.upper, key, span.lower)
            {
                return Err(Error::internal(
                    "interval tree construction",
                    format!("record {key} registered twice at node {home}"),
                ));
            }
        }

        for index in (0..tree.nodes.len()).rev() {
            tree.refresh(index)?;
        }

        debug!(
            "interval tree built: {} intervals, {} endpoints, {} nodes, {} void",
            tree.len,
            endpoints.len(),
            tree.nodes.len(),
            tree.voids.len()
        );
        Ok(tree)
    }

    /// Number of intervals currently stored (empty ones included).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes of the primary structure.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Removes the interval `interval` registered under `key`.
    ///
    /// Returns `Ok(false)` when no such interval is stored; the tree is left unchanged
    /// in that case.
    ///
    /// # Errors
    ///
    /// Fails with an internal invariant error when the two endpoint lists of the home
    /// node disagree, or when recomputing the derived fields towards the root finds a
    /// node that becomes active. Deletion only removes entries, so neither can happen
    /// in a consistent tree; the tree must not be used after such an error.
    pub fn delete(&mut self, key: RecordId, interval: &Interval) -> Result<bool> {
        let Some(span) = numeric_span(interval) else {
            return Ok(false);
        };

        if span.is_empty() {
            if self.voids.get(&key) == Some(&span) {
                self.voids.remove(&key);
                self.len -= 1;
                return Ok(true);
            }
            return Ok(false);
        }

        let Some(home) = self.home(span) else {
            return Ok(false);
        };
        let node = &mut self.nodes[home];
        if node.lower.get(span.lower, key) != Some(span.upper) {
            return Ok(false);
        }
        node.lower.remove(span.lower, key);
        if node.upper.remove(span.upper, key).is_none() {
            error!("interval tree: record {key} missing from upper list of node {home}");
            return Err(Error::internal(
                "interval tree delete",
                format!("record {key} present in the lower list of node {home} only"),
            ));
        }
        self.len -= 1;

        // Removing entries can only switch nodes off. A node switching on means its
        // stored flags were stale before this call.
        let mut index = home;
        loop {
            let before = self.nodes[index].activity();
            let after = self.refresh(index)?;
            if (after.active && !before.active) || (after.has_active && !before.has_active) {
                error!("interval tree: node {index} gained activity while deleting record {key}");
                return Err(Error::internal(
                    "interval tree delete",
                    format!("node {index} became active while deleting record {key}"),
                ));
            }
            if index == 0 {
                break;
            }
            index = (index - 1) / 2;
        }
        Ok(true)
    }

    /// Adds to `result` the key of every stored interval overlapping `query`.
    ///
    /// Returns `Ok(false)` (leaving `result` untouched) when the query endpoints are
    /// not numbers.
    pub fn window_query(&self, query: &Interval, result: &mut KeySet) -> Result<bool> {
        let Some(query) = numeric_span(query) else {
            return Ok(false);
        };
        if query.is_empty() {
            return Ok(true);
        }
        let Some(start) = self.nodes.first().and_then(|root| root.closest_active) else {
            return Ok(true);
        };

        let ql = query.lower.value;
        let qu = query.upper.value;

        // Phase 1: descend to the first node whose split value lies strictly inside
        // the query, reporting the partial overlaps on the way.
        let mut current = Some(start);
        let mut meeting = None;
        while let Some(index) = current {
            let node = self.node(index)?;
            if node.split <= ql {
                self.scan_upper(index, &query, result)?;
                current = node.right_tertiary;
            } else if node.split >= qu {
                self.scan_lower(index, &query, result)?;
                current = node.left_tertiary;
            } else {
                meeting = Some(index);
                break;
            }
        }
        let Some(meeting) = meeting else {
            return Ok(true);
        };
        let meeting = self.node(meeting)?;
        result.extend(meeting.lower.keys());

        // Phase 2: left of the meeting node every interval ends before the query does.
        let mut current = meeting.left_tertiary;
        while let Some(index) = current {
            let node = self.node(index)?;
            if ql < node.split {
                result.extend(node.upper.keys());
                if let Some(right) = node.right_tertiary {
                    self.visit_active(right, result)?;
                }
                current = node.left_tertiary;
            } else {
                self.scan_upper(index, &query, result)?;
                current = node.right_tertiary;
            }
        }

        // Phase 3: right of the meeting node every interval starts after the query does.
        let mut current = meeting.right_tertiary;
        while let Some(index) = current {
            let node = self.node(index)?;
            if node.split < qu {
                result.extend(node.lower.keys());
                if let Some(left) = node.left_tertiary {
                    self.visit_active(left, result)?;
                }
                current = node.right_tertiary;
            } else {
                self.scan_lower(index, &query, result)?;
                current = node.left_tertiary;
            }
        }
        Ok(true)
    }

    /// Adds every key stored at `index` or at any active node beneath it.
    pub(crate) fn visit_active(&self, index: usize, result: &mut KeySet) -> Result<()> {
        let mut stack = vec![index];
        while let Some(index) = stack.pop() {
            let node = self.node(index)?;
            result.extend(node.lower.keys());
            stack.extend(node.left_tertiary);
            stack.extend(node.right_tertiary);
        }
        Ok(())
    }

    /// Scans the upper list of a node whose split value is at or below the query's
    /// lower bound.
    fn scan_upper(&self, index: usize, query: &Span, result: &mut KeySet) -> Result<()> {
        let ql = query.lower;
        for (endpoint, key, opposite) in self.node(index)?.upper.iter() {
            let reaches = endpoint.value > ql.value
                || (endpoint.value == ql.value && !endpoint.open && !ql.open);
            if !reaches {
                break;
            }
            if query.overlaps_upper_entry(endpoint, opposite) {
                result.insert(key);
            }
        }
        Ok(())
    }

    /// Scans the lower list of a node whose split value is at or above the query's
    /// upper bound.
    fn scan_lower(&self, index: usize, query: &Span, result: &mut KeySet) -> Result<()> {
        let qu = query.upper;
        for (endpoint, key, opposite) in self.node(index)?.lower.iter() {
            let reaches = endpoint.value < qu.value
                || (endpoint.value == qu.value && !endpoint.open && !qu.open);
            if !reaches {
                break;
            }
            if query.overlaps_lower_entry(endpoint, opposite) {
                result.insert(key);
            }
        }
        Ok(())
    }

    /// Locates the node an interval belongs to: the first node on the descent whose
    /// split value lies within `[lower, upper]`.
    fn home(&self, span: Span) -> Option<usize> {
        let mut index = 0;
        loop {
            let node = self.nodes.get(index)?;
            if node.split < span.lower.value {
                index = 2 * index + 2;
            } else if node.split > span.upper.value {
                index = 2 * index + 1;
            } else {
                return Some(index);
            }
        }
    }

    fn node(&self, index: usize) -> Result<&Node> {
        self.nodes.get(index).ok_or_else(|| {
            Error::internal(
                "interval tree",
                format!("node {index} outside of {} nodes", self.nodes.len()),
            )
        })
    }

    /// Recomputes the derived fields of a node from its lists and its children.
    fn refresh(&mut self, index: usize) -> Result<Activity> {
        let children = self.children(index);
        let (left, right) = match children {
            Some((l, r)) => (
                (self.nodes[l].has_active, self.nodes[l].closest_active),
                (self.nodes[r].has_active, self.nodes[r].closest_active),
            ),
            None => ((false, None), (false, None)),
        };

        let node = &mut self.nodes[index];
        if node.lower.len() != node.upper.len() {
            return Err(Error::internal(
                "interval tree",
                format!(
                    "node {index} holds {} lower and {} upper endpoints",
                    node.lower.len(),
                    node.upper.len()
                ),
            ));
        }

        node.active = !node.lower.is_empty() || (left.0 && right.0);
        node.has_active = node.active || left.0 || right.0;
        node.closest_active = if node.active {
            Some(index)
        } else if left.0 {
            left.1
        } else if right.0 {
            right.1
        } else {
            None
        };
        if node.active {
            node.left_tertiary = left.1;
            node.right_tertiary = right.1;
        } else {
            node.left_tertiary = None;
            node.right_tertiary = None;
        }
        Ok(node.activity())
    }

    fn children(&self, index: usize) -> Option<(usize, usize)> {
        let right = 2 * index + 2;
        (right < self.nodes.len()).then_some((right - 1, right))
    }
}

impl fmt::Display for IntervalTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "interval tree: {} intervals, {} nodes",
            self.len,
            self.nodes.len()
        )?;
        for (index, node) in self.nodes.iter().enumerate() {
            if !node.has_active {
                continue;
            }
            write!(
                f,
                "  #{index} split={} range=[{}, {}]",
                node.split, node.min, node.max
            )?;
            if node.active {
                write!(f, " active lower={} upper={}", node.lower, node.upper)?;
            }
            writeln!(f)?;
        }
        if !self.voids.is_empty() {
            writeln!(f, "  void: [{}]", self.voids.keys().join(", "))?;
        }
        Ok(())
    }
}

/// Ways to break a tree on purpose, for exercising the invariant checks of
/// [`IntervalTree::delete`].
#[cfg(any(test, feature = "test-support"))]
impl IntervalTree {
    /// Drops the upper-list entry of a stored interval and keeps its lower-list entry.
    pub fn corrupt_upper_entry(&mut self, key: RecordId, interval: &Interval) -> bool {
        let Some(span) = numeric_span(interval) else {
            return false;
        };
        let Some(home) = self.home(span) else {
            return false;
        };
        self.nodes[home].upper.remove(span.upper, key).is_some()
    }

    /// Adds an interval to the lists of its home node without refreshing the derived
    /// fields, leaving that node's activity flags stale.
    pub fn insert_unrefreshed(&mut self, key: RecordId, interval: &Interval) -> bool {
        let Some(span) = numeric_span(interval) else {
            return false;
        };
        let Some(home) = self.home(span) else {
            return false;
        };
        let node = &mut self.nodes[home];
        node.lower.insert(span.lower, key, span.upper) && node.upper.insert(span.upper, key, span.lower)
    }
}

/// Lays out the primary structure for `endpoints` (sorted, distinct).
///
/// With `n` leaves the tree has `2n - 1` nodes and leaves at indices `n - 1..2n - 1`.
/// When `n` is not a power of two, the leaves at the deepest level (indices `p - 1..`
/// for `p = n.next_power_of_two()`) hold the smallest endpoints and the remaining
/// leaves, one level up, hold the rest; this keeps the in-order sequence sorted.
fn build_primary(endpoints: &BTreeSet<OrderedFloat<f64>>) -> Vec<Node> {
    let n = endpoints.len();
    if n == 0 {
        return Vec::new();
    }
    let p = n.next_power_of_two();
    let mut nodes = vec![Node::leaf(0.0); 2 * n - 1];
    let deep = (p - 1)..(2 * n - 1);
    let shallow = (n - 1)..(p - 1);
    for (slot, value) in deep.chain(shallow).zip(endpoints.iter()) {
        nodes[slot] = Node::leaf(value.0);
    }
    for index in (0..n - 1).rev() {
        let node = Node::internal(&nodes[2 * index + 1], &nodes[2 * index + 2]);
        nodes[index] = node;
    }
    nodes
}

/// Extracts the numeric endpoints of an interval; `None` for non-numeric or NaN
/// endpoints.
fn numeric_span(interval: &Interval) -> Option<Span> {
    let lower = number(&interval.lower)?;
    let upper = number(&interval.upper)?;
    Some(Span {
        lower: Bound::new(lower, interval.open_lower),
        upper: Bound::new(upper, interval.open_upper),
    })
}

fn number(value: &Value) -> Option<f64> {
    value.as_number().filter(|n| !n.is_nan())
}

#[cfg(test)]
pub(crate) fn check_structure(tree: &IntervalTree) {
    for (index, node) in tree.nodes.iter().enumerate() {
        if let Some((l, r)) = tree.children(index) {
            assert!(tree.nodes[l].max <= node.split && node.split <= tree.nodes[r].min);
            assert_eq!(node.min, tree.nodes[l].min);
            assert_eq!(node.max, tree.nodes[r].max);
        }
        if node.active {
            assert_eq!(node.closest_active, Some(index));
        } else {
            assert!(node.lower.is_empty() && node.upper.is_empty());
            assert!(node.left_tertiary.is_none() && node.right_tertiary.is_none());
        }
        for target in [node.left_tertiary, node.right_tertiary, node.closest_active]
            .into_iter()
            .flatten()
        {
            assert!(tree.nodes[target].active);
        }
    }
}
