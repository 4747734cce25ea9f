//! Application state - shared across all handlers.

use std::sync::Arc;

use slide_core::ports::{RateLimiterStore, StoreError};
use slide_core::{RateLimiterOptions, SlideLimiter};
use slide_infra::{InMemoryStore, RedisStore};

use crate::config::{AppConfig, StoreBackend};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub limiter: SlideLimiter,
}

impl AppState {
    /// Build the limiter on the configured store.
    pub async fn new(config: &AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn RateLimiterStore> = match config.backend {
            StoreBackend::Memory => {
                tracing::info!("Using in-memory store - limits are per process");
                memory_store(config)
            }
            StoreBackend::Redis => match RedisStore::connect(config.redis.clone()).await {
                Ok(store) => Arc::new(store),
                Err(e) if config.fallback_to_memory => {
                    tracing::error!(
                        "Failed to connect to Redis: {}. Using in-memory fallback.",
                        e
                    );
                    memory_store(config)
                }
                Err(e) => return Err(e),
            },
        };

        tracing::info!(
            window_ms = config.limiter.window_ms,
            max_limit = config.limiter.max_limit,
            "Application state initialized"
        );

        Ok(Self::with_store(store, config.limiter))
    }

    pub fn with_store(store: Arc<dyn RateLimiterStore>, defaults: RateLimiterOptions) -> Self {
        Self {
            limiter: SlideLimiter::with_options(store, defaults),
        }
    }
}

/// In-memory store with its idle windows purged in the background.
fn memory_store(config: &AppConfig) -> Arc<dyn RateLimiterStore> {
    let store = Arc::new(InMemoryStore::new());
    // Detached: runs for the life of the process.
    store.spawn_purge(config.purge_interval);
    tracing::debug!(
        every_secs = config.purge_interval.as_secs(),
        "Scheduled purge of idle windows"
    );
    store
}
