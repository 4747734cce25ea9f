//! Redis connection configuration and setup.

use std::time::Duration;

use redis::Client;
use redis::aio::ConnectionManager;

use slide_core::ports::StoreError;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

/// Open a managed connection, giving up after `connect_timeout`.
///
/// The returned manager reconnects on its own and is cheap to clone, so a
/// single handle can be shared by every caller.
pub async fn connect(config: &RedisConfig) -> Result<ConnectionManager, StoreError> {
    let client =
        Client::open(config.url.as_str()).map_err(|e| StoreError::Unavailable(e.to_string()))?;

    // Use timeout to prevent hanging if Redis is unreachable
    let conn_manager_fut = ConnectionManager::new(client);
    let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
        .await
        .map_err(|_| StoreError::Unavailable("Connection timed out".to_string()))?
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

    tracing::info!(url = %config.url, "Connected to Redis");

    Ok(conn)
}
