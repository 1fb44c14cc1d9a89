pub mod key_set;

pub use key_set::{KeySet, KeySetIter};

/// Identifier of an indexed record (a rectangle or a representative).
pub type Key = u32;
