//! Window options and facade-level defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

/// Default trailing window length, in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Default number of hits admitted per window.
pub const DEFAULT_MAX_LIMIT: u32 = 10;

/// Options for a single `hit`: how long the trailing window is and how many
/// hits it admits.
///
/// Both fields are always positive; the only ways in are [`WindowOptions::new`],
/// deserialization (validated the same way) and normalized
/// [`RateLimiterOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawWindowOptions")]
pub struct WindowOptions {
    window_ms: u64,
    max_limit: u32,
}

/// Unchecked wire form of [`WindowOptions`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWindowOptions {
    window_ms: u64,
    max_limit: u32,
}

impl TryFrom<RawWindowOptions> for WindowOptions {
    type Error = OptionsError;

    fn try_from(raw: RawWindowOptions) -> Result<Self, Self::Error> {
        Self::new(raw.window_ms, raw.max_limit)
    }
}

impl WindowOptions {
    /// Build options, rejecting a zero window or a zero limit.
    pub fn new(window_ms: u64, max_limit: u32) -> Result<Self, OptionsError> {
        if window_ms == 0 {
            return Err(OptionsError::ZeroWindow);
        }
        if max_limit == 0 {
            return Err(OptionsError::ZeroLimit);
        }
        Ok(Self {
            window_ms,
            max_limit,
        })
    }

    /// Trailing interval length in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Maximum admitted hits within any such interval.
    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Facade-level defaults, used whenever a caller omits per-call options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterOptions {
    pub window_ms: u64,
    pub max_limit: u32,
}

impl Default for RateLimiterOptions {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl RateLimiterOptions {
    /// Replace zero fields with their defaults.
    ///
    /// A zero value is treated as "not supplied", so the result always
    /// converts into valid [`WindowOptions`].
    pub fn normalized(self) -> Self {
        Self {
            window_ms: if self.window_ms == 0 {
                DEFAULT_WINDOW_MS
            } else {
                self.window_ms
            },
            max_limit: if self.max_limit == 0 {
                DEFAULT_MAX_LIMIT
            } else {
                self.max_limit
            },
        }
    }

    /// Load defaults from `RATE_LIMIT_WINDOW_MS` and `RATE_LIMIT_MAX`.
    pub fn from_env() -> Self {
        Self {
            window_ms: std::env::var("RATE_LIMIT_WINDOW_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_WINDOW_MS),
            max_limit: std::env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_LIMIT),
        }
        .normalized()
    }
}

impl From<RateLimiterOptions> for WindowOptions {
    fn from(options: RateLimiterOptions) -> Self {
        let options = options.normalized();
        Self {
            window_ms: options.window_ms,
            max_limit: options.max_limit,
        }
    }
}
