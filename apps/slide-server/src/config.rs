//! Application configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use slide_core::{RateLimiterOptions, WindowOptions};
use slide_infra::RedisStoreConfig;

/// Which store backs the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

/// Bucket names starting with this are kept for the server's own limits and
/// cannot be hit through the API.
pub const RESERVED_BUCKET_PREFIX: &str = "_";

/// Prefix `bucket` with [`RESERVED_BUCKET_PREFIX`] unless it already has it.
pub fn reserved_bucket(bucket: &str) -> String {
    if bucket.starts_with(RESERVED_BUCKET_PREFIX) {
        bucket.to_string()
    } else {
        format!("{}{}", RESERVED_BUCKET_PREFIX, bucket)
    }
}

/// Limits applied to the HTTP API itself, keyed by client address.
#[derive(Debug, Clone)]
pub struct HttpRateLimitConfig {
    pub enabled: bool,
    pub bucket: String,
    pub options: WindowOptions,
    /// Let requests through when the store cannot be reached.
    pub fail_open: bool,
}

impl Default for HttpRateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bucket: reserved_bucket("http"),
            options: RateLimiterOptions {
                window_ms: 60_000,
                max_limit: 100,
            }
            .into(),
            fail_open: true,
        }
    }
}

impl HttpRateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let options = RateLimiterOptions {
            window_ms: env::var("HTTP_RATE_LIMIT_WINDOW_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.options.window_ms()),
            max_limit: env::var("HTTP_RATE_LIMIT_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.options.max_limit()),
        }
        .normalized();

        Self {
            enabled: env::var("HTTP_RATE_LIMIT_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            bucket: env::var("HTTP_RATE_LIMIT_BUCKET")
                .map(|bucket| reserved_bucket(&bucket))
                .unwrap_or(defaults.bucket),
            options: options.into(),
            fail_open: env::var("RATE_LIMIT_FAIL_OPEN")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.fail_open),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    /// Use the in-memory store when Redis cannot be reached at startup.
    pub fallback_to_memory: bool,
    /// Defaults for hits that carry no options.
    pub limiter: RateLimiterOptions,
    pub http_limit: HttpRateLimitConfig,
    pub redis: RedisStoreConfig,
    /// How often the in-memory store drops idle windows.
    pub purge_interval: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let backend = env::var("STORE_BACKEND")
            .ok()
            .and_then(|s| match s.parse() {
                Ok(backend) => Some(backend),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring STORE_BACKEND, using memory");
                    None
                }
            })
            .unwrap_or(StoreBackend::Memory);

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            backend,
            fallback_to_memory: env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            limiter: RateLimiterOptions::from_env(),
            http_limit: HttpRateLimitConfig::from_env(),
            redis: RedisStoreConfig::from_env(),
            purge_interval: Duration::from_secs(
                env::var("MEMORY_PURGE_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(60),
            ),
        }
    }
}
