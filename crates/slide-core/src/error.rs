//! Domain-level error types.

use thiserror::Error;

/// Invalid window options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("windowMs must be a positive number of milliseconds")]
    ZeroWindow,

    #[error("maxLimit must be a positive number of hits")]
    ZeroLimit,
}
