//! Matching of record rectangles against each other.
//!
//! A [`Rectangles`] collection holds, per record, the intervals the record offers
//! (exported attributes) and the intervals it requires of a counterpart (imported
//! attributes). A [`QueryProcessor`] indexes one such collection and answers batches
//! of query rectangles with the set of compatible records. [`Query`] combines several
//! batches with AND/OR.

pub mod options;
pub mod query;
pub mod query_processor;
pub mod rectangles;
pub mod summary;

#[cfg(test)]
mod tests;

pub use options::QueryOptions;
pub use query::Query;
pub use query_processor::QueryProcessor;
pub use rectangles::{Direction, Origin, Port, PortId, Rectangles};
pub use summary::{Dedup, Summary};

/// Identifier of the advertisement a rectangle was derived from.
pub type AdId = u32;
