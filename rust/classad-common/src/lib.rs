//! Error type, result alias and precondition checks shared by the classad-* crates.

pub mod error;

/// Result of every fallible classad-* operation.
pub type Result<T> = std::result::Result<T, error::Error>;

/// Returns an `InvalidArgument` error from the enclosing function unless `$cond` holds.
/// `$name` names the offending argument; the message quotes the failed condition.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $cond:expr) => {
        if !($cond) {
            return Err($crate::error::Error::invalid_arg(
                stringify!($name),
                concat!("requires ", stringify!($cond)),
            ));
        }
    };
}

/// Returns an `InvalidFormat` error from the enclosing function unless `$cond` holds.
/// Used while checking deserialized or caller-built collections.
#[macro_export]
macro_rules! verify_data {
    ($element:expr, $cond:expr) => {
        if !($cond) {
            return Err($crate::error::Error::invalid_format(
                stringify!($element),
                concat!("violates ", stringify!($cond)),
            ));
        }
    };
}
