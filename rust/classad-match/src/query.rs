//! Boolean combinations of query windows.

use classad_common::Result;
use classad_keyset::KeySet;

use crate::{query_processor::QueryProcessor, rectangles::Rectangles};

/// A tree of query windows evaluated against one [`QueryProcessor`].
pub enum Query<'a> {
    Single(&'a Rectangles),
    And(Box<Query<'a>>, Box<Query<'a>>),
    Or(Box<Query<'a>>, Box<Query<'a>>),
}

impl<'a> Query<'a> {
    pub fn single(window: &'a Rectangles) -> Query<'a> {
        Query::Single(window)
    }

    pub fn and(left: Query<'a>, right: Query<'a>) -> Query<'a> {
        Query::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Query<'a>, right: Query<'a>) -> Query<'a> {
        Query::Or(Box::new(left), Box::new(right))
    }

    /// Adds the matches of the query to `result`.
    ///
    /// `And` evaluates both operands into fresh sets and adds their intersection.
    /// `Or` evaluates both operands one after the other into `result` itself.
    pub fn run(&self, processor: &mut QueryProcessor, result: &mut KeySet) -> Result<()> {
        match self {
            Query::Single(window) => processor.do_query(window, result),
            Query::And(left, right) => {
                let mut matched = KeySet::new();
                left.run(processor, &mut matched)?;
                let mut other = KeySet::new();
                right.run(processor, &mut other)?;
                matched &= &other;
                *result |= &matched;
                Ok(())
            }
            Query::Or(left, right) => {
                left.run(processor, result)?;
                right.run(processor, result)
            }
        }
    }
}
