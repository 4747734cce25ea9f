//! In-memory sliding-window store.
//!
//! Keeps every admitted timestamp per `(bucket, key)` in a deque. Limits are
//! per-process, not shared across instances; use the Redis store for that.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use slide_core::WindowOptions;
use slide_core::ports::{Clock, HitOutcome, RateLimiterStore, StoreError};

use crate::clock::SystemClock;

/// Composite `(bucket, key)` identifying one window.
type WindowKey = (String, String);

/// Admitted timestamps for one `(bucket, key)`.
#[derive(Debug, Default)]
struct Window {
    hits: VecDeque<u64>,
    /// Widest window any hit on this key asked for; purging never uses less.
    window_ms: u64,
}

impl Window {
    /// Whether every recorded hit is outside this entry's widest window.
    fn is_expired(&self, now: u64) -> bool {
        match (self.hits.back(), now.checked_sub(self.window_ms)) {
            (None, _) => true,
            (Some(&newest), Some(trim_time)) => newest <= trim_time,
            (Some(_), None) => false,
        }
    }
}

/// In-memory store using a `HashMap` of timestamp deques behind an async mutex.
///
/// Trim, count and append for a hit happen under a single lock acquisition,
/// so the store is safe to share across tasks on a multi-threaded runtime.
/// Windows whose hits have all aged out are dropped by [`purge_expired`];
/// long-running owners should call [`spawn_purge`].
/// Note: Data is lost on process restart.
///
/// [`purge_expired`]: InMemoryStore::purge_expired
/// [`spawn_purge`]: InMemoryStore::spawn_purge
pub struct InMemoryStore<C: Clock = SystemClock> {
    windows: Mutex<HashMap<WindowKey, Window>>,
    clock: C,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of timestamps currently stored for `(bucket, key)`.
    ///
    /// Entries are only trimmed by a hit, so this may include timestamps that
    /// have already aged out of the window.
    pub async fn window_len(&self, bucket: &str, key: &str) -> usize {
        let windows = self.windows.lock().await;
        windows
            .get(&(bucket.to_string(), key.to_string()))
            .map_or(0, |window| window.hits.len())
    }

    /// Number of `(bucket, key)` windows held in memory.
    pub async fn tracked_windows(&self) -> usize {
        self.windows.lock().await.len()
    }

    /// Drop every window whose newest hit is outside the widest window that
    /// key was ever hit with.
    ///
    /// Returns the number of windows removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut windows = self.windows.lock().await;
        let before = windows.len();

        windows.retain(|_, window| !window.is_expired(now));

        let removed = before - windows.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = windows.len(), "Purged expired windows");
        }
        removed
    }
}

impl<C: Clock + 'static> InMemoryStore<C> {
    /// Run [`purge_expired`](Self::purge_expired) every `every` on the
    /// current tokio runtime until the handle is aborted.
    pub fn spawn_purge(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.purge_expired().await;
            }
        })
    }
}

/// Pop every timestamp at or before `now - window_ms` off the front.
///
/// Front removal is only correct because the deque is kept in
/// non-decreasing order.
fn slide_window(hits: &mut VecDeque<u64>, now: u64, window_ms: u64) {
    let Some(trim_time) = now.checked_sub(window_ms) else {
        return;
    };
    while hits.front().is_some_and(|&oldest| oldest <= trim_time) {
        hits.pop_front();
    }
}

#[async_trait]
impl<C: Clock> RateLimiterStore for InMemoryStore<C> {
    async fn hit_outcome(
        &self,
        bucket: &str,
        key: &str,
        options: WindowOptions,
    ) -> Result<HitOutcome, StoreError> {
        let window_ms = options.window_ms();
        let max_limit = options.max_limit() as usize;

        let mut windows = self.windows.lock().await;
        let now = self.clock.now_ms();

        let window = windows
            .entry((bucket.to_string(), key.to_string()))
            .or_default();
        window.window_ms = window.window_ms.max(window_ms);

        slide_window(&mut window.hits, now, window_ms);

        if window.hits.len() >= max_limit {
            return Ok(HitOutcome::denied());
        }

        // A clock that stepped backwards must not break the ordering.
        let stamp = window.hits.back().map_or(now, |&newest| newest.max(now));
        window.hits.push_back(stamp);

        Ok(HitOutcome::admitted((max_limit - window.hits.len()) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slide_core::ports::ManualClock;

    fn manual_store(start_ms: u64) -> (InMemoryStore<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        (InMemoryStore::with_clock(clock.clone()), clock)
    }

    fn opts(window_ms: u64, max_limit: u32) -> WindowOptions {
        WindowOptions::new(window_ms, max_limit).unwrap()
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let store = InMemoryStore::new();
        assert_eq!(store.tracked_windows().await, 0);
        assert_eq!(store.window_len("main", "t1").await, 0);
    }

    #[tokio::test]
    async fn test_slides_the_time_window() {
        let (store, clock) = manual_store(1_000_000);
        let options = opts(2000, 5);

        // Initial hit
        store.hit("main", "t1", options).await.unwrap();
        store.hit("main", "t2", options).await.unwrap();
        clock.advance(Duration::from_millis(2000));

        // New hits enforce window sliding
        assert_eq!(store.hit("main", "t1", options).await.unwrap(), 4);
        assert_eq!(store.hit("main", "t1", options).await.unwrap(), 3);
        store.hit("main", "t2", options).await.unwrap();
        let remaining = store.hit("main", "t1", options).await.unwrap();

        // The oldest timestamp was removed
        assert_eq!(remaining, 2);
        assert_eq!(store.window_len("main", "t2").await, 1);
    }

    #[tokio::test]
    async fn test_slides_with_real_clock() {
        let store = InMemoryStore::new();
        let options = opts(200, 2);

        assert_eq!(store.hit("main", "t1", options).await.unwrap(), 1);
        assert_eq!(store.hit("main", "t1", options).await.unwrap(), 0);
        assert_eq!(store.hit("main", "t1", options).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(store.hit("main", "t1", options).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_limits_requests_within_the_window() {
        let (store, _clock) = manual_store(1_000_000);
        let max_limit = 3;
        let options = opts(5000, max_limit);

        for i in 0..max_limit {
            let remaining = store.hit("main", "t3", options).await.unwrap();
            assert_eq!(remaining, max_limit - (i + 1));
        }

        let remaining = store.hit("main", "t3", options).await.unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_denies_beyond_max_limit_without_mutation() {
        let (store, clock) = manual_store(1_000_000);
        let options = opts(5000, 2);

        let first = store.hit_outcome("main", "t4", options).await.unwrap();
        let second = store.hit_outcome("main", "t4", options).await.unwrap();
        assert_eq!(first, HitOutcome::admitted(1));
        assert_eq!(second, HitOutcome::admitted(0));

        for _ in 0..5 {
            clock.advance(Duration::from_millis(10));
            let outcome = store.hit_outcome("main", "t4", options).await.unwrap();
            assert_eq!(outcome, HitOutcome::denied());
            assert_eq!(store.window_len("main", "t4").await, 2);
        }
    }

    #[tokio::test]
    async fn test_entry_exactly_window_old_is_trimmed() {
        let (store, clock) = manual_store(10_000);
        let options = opts(1000, 1);

        assert_eq!(store.hit("main", "k", options).await.unwrap(), 0);

        clock.advance(Duration::from_millis(999));
        let outcome = store.hit_outcome("main", "k", options).await.unwrap();
        assert!(!outcome.admitted);

        clock.advance(Duration::from_millis(1));
        let outcome = store.hit_outcome("main", "k", options).await.unwrap();
        assert!(outcome.admitted);
    }

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let (store, _clock) = manual_store(1_000_000);
        let options = opts(5000, 2);

        store.hit("bucket-a", "ip", options).await.unwrap();
        store.hit("bucket-a", "ip", options).await.unwrap();
        assert_eq!(store.hit("bucket-a", "ip", options).await.unwrap(), 0);

        assert_eq!(store.hit("bucket-b", "ip", options).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let (store, _clock) = manual_store(1_000_000);
        let options = opts(5000, 2);

        store.hit("main", "key1", options).await.unwrap();
        store.hit("main", "key1", options).await.unwrap();

        assert_eq!(store.hit("main", "key2", options).await.unwrap(), 1);
        assert_eq!(store.tracked_windows().await, 2);
    }

    #[tokio::test]
    async fn test_empty_names_are_literal_keys() {
        let (store, _clock) = manual_store(1_000_000);
        let options = opts(5000, 2);

        assert_eq!(store.hit("", "", options).await.unwrap(), 1);
        assert_eq!(store.hit("", "", options).await.unwrap(), 0);
        assert_eq!(store.hit("", "x", options).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clock_stepping_back_keeps_order() {
        let (store, clock) = manual_store(10_000);
        let options = opts(1000, 5);

        store.hit("main", "k", options).await.unwrap();
        clock.set(9_500);
        store.hit("main", "k", options).await.unwrap();

        // Both entries are stamped 10_000, so both expire together.
        clock.set(11_000);
        assert_eq!(store.hit("main", "k", options).await.unwrap(), 4);
        assert_eq!(store.window_len("main", "k").await, 1);
    }

    #[tokio::test]
    async fn test_early_clock_does_not_trim() {
        let (store, _clock) = manual_store(0);
        let options = opts(60_000, 2);

        assert_eq!(store.hit("main", "k", options).await.unwrap(), 1);
        assert_eq!(store.hit("main", "k", options).await.unwrap(), 0);
        assert!(!store.hit_outcome("main", "k", options).await.unwrap().admitted);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (store, clock) = manual_store(10_000);
        let options = opts(1000, 5);

        store.hit("main", "old", options).await.unwrap();
        clock.advance(Duration::from_millis(500));
        store.hit("main", "fresh", options).await.unwrap();
        clock.advance(Duration::from_millis(600));

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.tracked_windows().await, 1);
        assert_eq!(store.window_len("main", "old").await, 0);
        assert_eq!(store.window_len("main", "fresh").await, 1);
    }

    #[tokio::test]
    async fn test_idle_keys_are_released() {
        let (store, clock) = manual_store(10_000);
        let options = opts(1000, 5);

        for i in 0..1000 {
            let ip = format!("10.0.{}.{}", i / 256, i % 256);
            store.hit("http", &ip, options).await.unwrap();
        }
        clock.advance(Duration::from_secs(3600));

        assert_eq!(store.purge_expired().await, 1000);
        store.hit("http", "10.9.9.9", options).await.unwrap();
        assert_eq!(store.tracked_windows().await, 1);
    }

    #[tokio::test]
    async fn test_purge_respects_each_key_window() {
        let (store, clock) = manual_store(1_000_000);
        let long = opts(120_000, 1);
        let short = opts(60_000, 1);

        assert!(store.hit_outcome("login", "alice", long).await.unwrap().admitted);
        store.hit("login", "bob", short).await.unwrap();
        clock.advance(Duration::from_secs(61));

        // Only the short window has aged out.
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.window_len("login", "bob").await, 0);

        let second = store.hit_outcome("login", "alice", long).await.unwrap();
        assert!(!second.admitted);
    }

    #[tokio::test]
    async fn test_purge_uses_widest_window_seen() {
        let (store, clock) = manual_store(1_000_000);

        store.hit("login", "alice", opts(120_000, 5)).await.unwrap();
        store.hit("login", "alice", opts(1_000, 5)).await.unwrap();
        clock.advance(Duration::from_secs(61));

        assert_eq!(store.purge_expired().await, 0);
        assert_eq!(store.window_len("login", "alice").await, 2);
    }

    #[tokio::test]
    async fn test_spawned_purge_releases_idle_keys() {
        let clock = Arc::new(ManualClock::new(10_000));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let options = opts(1000, 5);

        store.hit("http", "10.0.0.1", options).await.unwrap();
        clock.advance(Duration::from_secs(60));

        let handle = store.spawn_purge(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(store.tracked_windows().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_hits_never_exceed_limit() {
        let store = Arc::new(InMemoryStore::new());
        let options = opts(60_000, 10);

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.hit_outcome("main", "shared", options).await })
            })
            .collect();

        let outcomes = futures::future::join_all(tasks).await;
        let admitted = outcomes
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .filter(|outcome| outcome.admitted)
            .count();

        assert_eq!(admitted, 10);
        assert_eq!(store.window_len("main", "shared").await, 10);
    }
}
