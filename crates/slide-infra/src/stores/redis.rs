//! Redis sliding-window store shared by every process pointing at the same server.

use std::time::Duration;

use async_trait::async_trait;
use redis::Script;
use redis::aio::{ConnectionLike, ConnectionManager};

use slide_core::WindowOptions;
use slide_core::ports::{HitOutcome, RateLimiterStore, StoreError};

use crate::connection::{RedisConfig, connect};

/// Trim, count and conditionally record one hit, atomically on the server.
///
/// KEYS[1] = window key, ARGV = window_ms, max_limit, nonce.
/// Returns `{remaining, admitted}`. The server clock is authoritative; the
/// member carries the microsecond part plus a client nonce so hits landing in
/// the same millisecond stay distinct.
const HIT_SCRIPT: &str = r#"
local key = KEYS[1]
local window_ms = tonumber(ARGV[1])
local limit = tonumber(ARGV[2])
local nonce = ARGV[3]

local time = redis.call('TIME')
local now_ms = tonumber(time[1]) * 1000 + math.floor(tonumber(time[2]) / 1000)
local trim_time = now_ms - window_ms

redis.call('ZREMRANGEBYSCORE', key, '-inf', trim_time)
local request_count = redis.call('ZCARD', key)

if request_count < limit then
    redis.call('ZADD', key, now_ms, time[1] .. '.' .. time[2] .. ':' .. nonce)
    redis.call('PEXPIRE', key, window_ms)
    return {limit - request_count - 1, 1}
end
return {0, 0}
"#;

/// Redis store configuration.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection config
    pub redis: RedisConfig,
    /// Prefix for window keys; empty means none
    pub key_prefix: String,
    /// Upper bound on a single hit round trip
    pub command_timeout: Option<Duration>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            key_prefix: "ratelimit".to_string(),
            command_timeout: None,
        }
    }
}

impl RedisStoreConfig {
    pub fn from_env() -> Self {
        Self {
            redis: RedisConfig::from_env(),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
            command_timeout: std::env::var("RATE_LIMIT_COMMAND_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis),
        }
    }
}

/// Redis-backed store keeping each window in a sorted set scored by
/// server time in milliseconds.
///
/// Needs no client-side locking: every hit is a single script evaluation,
/// which Redis runs without interleaving other commands. The connection is
/// cloned per call, so it must be a cheap shared handle such as
/// [`ConnectionManager`].
pub struct RedisStore<C = ConnectionManager> {
    conn: C,
    config: RedisStoreConfig,
    script: Script,
}

impl<C> RedisStore<C> {
    /// Wrap an already established connection.
    pub fn new(conn: C, config: RedisStoreConfig) -> Self {
        Self {
            conn,
            config,
            script: Script::new(HIT_SCRIPT),
        }
    }

    pub fn conn(&self) -> &C {
        &self.conn
    }
}

impl RedisStore {
    /// Connect using `config.redis` and build the store.
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let conn = connect(&config.redis).await?;

        tracing::info!(
            key_prefix = %config.key_prefix,
            command_timeout_ms = config.command_timeout.map(|d| d.as_millis() as u64),
            "Redis rate limiter store ready"
        );

        Ok(Self::new(conn, config))
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::connect(RedisStoreConfig::from_env()).await
    }

}

fn window_key(prefix: &str, bucket: &str, key: &str) -> String {
    if prefix.is_empty() {
        format!("{}:{}", bucket, key)
    } else {
        format!("{}:{}:{}", prefix, bucket, key)
    }
}

fn parse_reply(reply: &[i64]) -> Result<HitOutcome, StoreError> {
    match reply {
        [remaining, 1] => Ok(HitOutcome::admitted(
            u32::try_from(*remaining).unwrap_or_default(),
        )),
        [_, 0] => Ok(HitOutcome::denied()),
        other => Err(StoreError::Unavailable(format!(
            "Unexpected hit script reply: {:?}",
            other
        ))),
    }
}

#[async_trait]
impl<C> RateLimiterStore for RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    async fn hit_outcome(
        &self,
        bucket: &str,
        key: &str,
        options: WindowOptions,
    ) -> Result<HitOutcome, StoreError> {
        let redis_key = window_key(&self.config.key_prefix, bucket, key);
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let mut conn = self.conn.clone();

        let mut invocation = self.script.prepare_invoke();
        invocation
            .key(&redis_key)
            .arg(options.window_ms())
            .arg(options.max_limit())
            .arg(&nonce);

        let call = invocation.invoke_async(&mut conn);
        let reply: Vec<i64> = match self.config.command_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| StoreError::Unavailable("Command timed out".to_string()))?,
            None => call.await,
        }
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        parse_reply(&reply)
    }
}
