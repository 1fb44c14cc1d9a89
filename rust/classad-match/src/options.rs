//! Query processor configuration.

use classad_common::{Result, error::Error};

/// Default limit on the number of query rectangles in one window.
pub const MAX_WINDOW: usize = 1 << 20;

/// Controls which candidates survive an attribute filter besides the ones the index
/// reports.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Keep candidates that do not declare the filtered attribute at all.
    pub keep_undeclared: bool,
    /// Keep candidates whose declaration of the filtered attribute could not be
    /// indexed.
    pub keep_deviant: bool,
    /// Maximum number of query rectangles accepted by one `do_query` call.
    pub max_window: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            keep_undeclared: true,
            keep_deviant: true,
            max_window: MAX_WINDOW,
        }
    }
}

impl QueryOptions {
    /// Validates the options and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_window == 0 {
            return Err(Error::invalid_arg(
                "max_window",
                "must be greater than 0",
            ));
        }
        if self.max_window > u32::MAX as usize {
            return Err(Error::invalid_arg(
                "max_window",
                format!("must not exceed {}", u32::MAX),
            ));
        }
        Ok(())
    }
}
