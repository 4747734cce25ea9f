//! System wall clock.

use slide_core::ports::Clock;

/// Reads the host's wall clock through `chrono`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // Pre-epoch clocks are treated as the epoch itself.
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}
