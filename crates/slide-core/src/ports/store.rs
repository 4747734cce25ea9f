//! Rate limiter store port.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::WindowOptions;

/// Result of a single hit against a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    /// `max_limit` minus the hits counted in the window after this call.
    pub remaining: u32,
    /// Whether this call was recorded in the window.
    pub admitted: bool,
}

impl HitOutcome {
    pub fn admitted(remaining: u32) -> Self {
        Self {
            remaining,
            admitted: true,
        }
    }

    pub fn denied() -> Self {
        Self {
            remaining: 0,
            admitted: false,
        }
    }
}

/// Store trait - abstraction over sliding-window backends (in-memory, Redis).
///
/// A backend keeps, per `(bucket, key)`, the timestamps of admitted hits
/// inside the trailing window. Trimming, counting and the conditional append
/// must behave as one indivisible step per `(bucket, key)`.
#[async_trait]
pub trait RateLimiterStore: Send + Sync {
    /// Trim the window, then record the hit if it still has room.
    async fn hit_outcome(
        &self,
        bucket: &str,
        key: &str,
        options: WindowOptions,
    ) -> Result<HitOutcome, StoreError>;

    /// Record a hit and return the remaining quota.
    ///
    /// `0` means either this call took the last slot or it was denied.
    async fn hit(&self, bucket: &str, key: &str, options: WindowOptions) -> Result<u32, StoreError> {
        Ok(self.hit_outcome(bucket, key, options).await?.remaining)
    }
}

#[async_trait]
impl<S: RateLimiterStore + ?Sized> RateLimiterStore for Arc<S> {
    async fn hit_outcome(
        &self,
        bucket: &str,
        key: &str,
        options: WindowOptions,
    ) -> Result<HitOutcome, StoreError> {
        (**self).hit_outcome(bucket, key, options).await
    }
}

/// Placeholder store documenting the contract.
///
/// Every call fails with [`StoreError::NotImplemented`]; wiring this into a
/// limiter is a configuration defect, not a runtime condition.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedStore;

#[async_trait]
impl RateLimiterStore for UnimplementedStore {
    async fn hit_outcome(
        &self,
        _bucket: &str,
        _key: &str,
        _options: WindowOptions,
    ) -> Result<HitOutcome, StoreError> {
        Err(StoreError::NotImplemented)
    }
}

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Method not implemented")]
    NotImplemented,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
