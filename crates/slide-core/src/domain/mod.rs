//! Domain models.

mod options;

pub use options::{DEFAULT_MAX_LIMIT, DEFAULT_WINDOW_MS, RateLimiterOptions, WindowOptions};
