//! # Slide Infrastructure
//!
//! Concrete implementations of the ports defined in `slide-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `redis` - Redis-backed store shared across processes

pub mod clock;
pub mod stores;

#[cfg(feature = "redis")]
pub mod connection;

// Re-exports - In-Memory
pub use clock::SystemClock;
pub use stores::InMemoryStore;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use connection::{RedisConfig, connect};
#[cfg(feature = "redis")]
pub use stores::{RedisStore, RedisStoreConfig};
