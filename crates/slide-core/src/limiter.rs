//! Limiter facade - binds one store to one set of default options.

use std::sync::Arc;

use crate::domain::{RateLimiterOptions, WindowOptions};
use crate::ports::{HitOutcome, RateLimiterStore, StoreError};

/// Sliding-window rate limiter.
///
/// Holds no window state of its own: every call is forwarded to the bound
/// store, with per-call options replacing the defaults wholesale.
pub struct SlideLimiter<S: RateLimiterStore + ?Sized = dyn RateLimiterStore> {
    store: Arc<S>,
    options: RateLimiterOptions,
}

impl<S: RateLimiterStore + ?Sized> SlideLimiter<S> {
    /// Create a limiter with the default options (60s window, 10 hits).
    pub fn new(store: Arc<S>) -> Self {
        Self::with_options(store, RateLimiterOptions::default())
    }

    /// Create a limiter with custom defaults. Zero fields fall back to the
    /// built-in defaults.
    pub fn with_options(store: Arc<S>, options: RateLimiterOptions) -> Self {
        Self {
            store,
            options: options.normalized(),
        }
    }

    pub fn options(&self) -> RateLimiterOptions {
        self.options
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Hit the limiter and return the remaining quota.
    pub async fn hit(
        &self,
        bucket: &str,
        key: &str,
        options: Option<WindowOptions>,
    ) -> Result<u32, StoreError> {
        Ok(self.hit_outcome(bucket, key, options).await?.remaining)
    }

    /// Hit the limiter and report whether the hit was admitted.
    pub async fn hit_outcome(
        &self,
        bucket: &str,
        key: &str,
        options: Option<WindowOptions>,
    ) -> Result<HitOutcome, StoreError> {
        let options = options.unwrap_or_else(|| self.options.into());
        let outcome = self.store.hit_outcome(bucket, key, options).await?;

        tracing::trace!(
            bucket = %bucket,
            key = %key,
            remaining = outcome.remaining,
            admitted = outcome.admitted,
            "Rate limiter hit"
        );

        Ok(outcome)
    }
}

impl<S: RateLimiterStore + ?Sized> Clone for SlideLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            options: self.options,
        }
    }
}
