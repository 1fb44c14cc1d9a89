mod index_tests;

use crate::{Dimension, Interval};

pub(crate) fn dimension(intervals: impl IntoIterator<Item = Interval>) -> Dimension {
    intervals
        .into_iter()
        .map(|interval| (interval.key, interval))
        .collect()
}
