//! # Slide Core
//!
//! The domain layer of the sliding-window rate limiter.
//! This crate holds the options model, the store contract every backend
//! implements, and the [`SlideLimiter`] facade. It has no infrastructure
//! dependencies.

pub mod domain;
pub mod error;
pub mod limiter;
pub mod ports;

pub use domain::{RateLimiterOptions, WindowOptions};
pub use error::OptionsError;
pub use limiter::SlideLimiter;
pub use ports::{Clock, HitOutcome, ManualClock, RateLimiterStore, StoreError, UnimplementedStore};
