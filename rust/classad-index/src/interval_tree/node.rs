use super::secondary::{LowerList, UpperList};

/// A node of the primary structure.
///
/// Leaves carry one distinct endpoint value as their split value; internal nodes
/// split halfway between the largest value of the left subtree and the smallest value
/// of the right subtree. Every interval lives at exactly one node: the first node on
/// the root-to-leaf descent whose split value lies within the interval.
#[derive(Clone)]
pub(crate) struct Node {
    pub split: f64,
    pub min: f64,
    pub max: f64,
    /// The node has intervals of its own, or active nodes in both subtrees.
    pub active: bool,
    /// The subtree rooted here (this node included) contains an active node.
    pub has_active: bool,
    /// This node when active, otherwise the closest active node of the only subtree
    /// that has one.
    pub closest_active: Option<usize>,
    /// Closest active node of the left subtree; set only on active nodes.
    pub left_tertiary: Option<usize>,
    /// Closest active node of the right subtree; set only on active nodes.
    pub right_tertiary: Option<usize>,
    pub lower: LowerList,
    pub upper: UpperList,
}

/// The derived activity fields of a node, as computed from its lists and children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Activity {
    pub active: bool,
    pub has_active: bool,
}

impl Node {
    pub fn leaf(value: f64) -> Node {
        Node {
            split: value,
            min: value,
            max: value,
            active: false,
            has_active: false,
            closest_active: None,
            left_tertiary: None,
            right_tertiary: None,
            lower: LowerList::new(),
            upper: UpperList::new(),
        }
    }

    pub fn internal(left: &Node, right: &Node) -> Node {
        Node {
            split: midpoint(left.max, right.min),
            min: left.min,
            max: right.max,
            ..Node::leaf(0.0)
        }
    }

    pub fn activity(&self) -> Activity {
        Activity {
            active: self.active,
            has_active: self.has_active,
        }
    }
}

/// A split value between two adjacent endpoint ranges, never NaN and never outside
/// `[a, b]`.
pub(crate) fn midpoint(a: f64, b: f64) -> f64 {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => (a / 2.0 + b / 2.0).clamp(a, b),
        (true, false) => a,
        (false, true) => b,
        (false, false) if a == b => a,
        (false, false) => 0.0,
    }
}
