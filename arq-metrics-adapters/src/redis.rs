//! Redis health store.
//!
//! Reads the health check with a plain `GET` over a
//! [`ConnectionManager`], which reconnects on its own after the connection
//! drops. A failed `GET` is still reported to the poller, which stops.
//!
//! ## Example
//!
//! ```rust,no_run
//! use arq_metrics::HealthStore;
//! use arq_metrics_adapters::redis::RedisStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisStore::builder()
//!         .url("redis://localhost:6379/0")
//!         .build()
//!         .await?;
//!
//!     if let Some(raw) = store.get("arq:queue:health-check").await? {
//!         println!("health check: {}", raw);
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::{AsyncCommands, Client};
use arq_metrics::{HealthStore, StoreError};
use async_trait::async_trait;
use tracing::debug;

use crate::AdapterError;

const DEFAULT_URL: &str = "redis://localhost:6379";
const DEFAULT_CONNECTION_RETRIES: usize = 3;
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
// Upper bound on the backoff between two reconnection attempts, in ms.
const MAX_RETRY_DELAY_MS: u64 = 1_000;

/// Redis-backed [`HealthStore`].
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Create a new builder for configuring the store.
    pub fn builder() -> RedisStoreBuilder {
        RedisStoreBuilder::default()
    }

    /// Wrap an existing connection manager, e.g. one shared with the worker.
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, AdapterError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}

#[async_trait]
impl HealthStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_raw(key).await?)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish()
    }
}

/// Builder for RedisStore.
#[derive(Debug, Default)]
pub struct RedisStoreBuilder {
    url: Option<String>,
    connection_retries: Option<usize>,
    connection_timeout: Option<Duration>,
    response_timeout: Option<Duration>,
}

impl RedisStoreBuilder {
    /// Set the Redis URL (default: "redis://localhost:6379").
    ///
    /// Accepts the `redis://`, `rediss://` and `unix://` schemes, including a
    /// database number and credentials.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set how many times a failed connection attempt is retried (default: 3).
    ///
    /// Applies to the initial connection made by [`build`](Self::build) and
    /// to reconnections after the connection drops.
    pub fn connection_retries(mut self, retries: usize) -> Self {
        self.connection_retries = Some(retries);
        self
    }

    /// Set the timeout for a single connection attempt (default: 5s).
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Set the timeout for a single command (default: 5s).
    ///
    /// A `GET` that times out is reported to the poller as a store failure.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Connect and build the store.
    pub async fn build(self) -> Result<RedisStore, AdapterError> {
        let client = self.client()?;
        debug!(addr = %client.get_connection_info().addr, "Connecting to Redis");

        let conn = ConnectionManager::new_with_config(client, self.manager_config())
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        Ok(RedisStore { conn })
    }

    fn manager_config(&self) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_number_of_retries(self.connection_retries.unwrap_or(DEFAULT_CONNECTION_RETRIES))
            .set_max_delay(MAX_RETRY_DELAY_MS)
            .set_connection_timeout(self.connection_timeout.unwrap_or(DEFAULT_CONNECTION_TIMEOUT))
            .set_response_timeout(self.response_timeout.unwrap_or(DEFAULT_RESPONSE_TIMEOUT))
    }

    fn client(&self) -> Result<Client, AdapterError> {
        let url = self.url.as_deref().unwrap_or(DEFAULT_URL);
        Client::open(url).map_err(|e| AdapterError::InvalidUrl(format!("{}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = RedisStore::builder();
        assert!(builder.url.is_none());

        let client = builder.client().unwrap();
        assert_eq!(client.get_connection_info().addr.to_string(), "localhost:6379");
    }

    #[test]
    fn test_builder_url() {
        let builder = RedisStore::builder().url("redis://cache.internal:6380/2");

        let client = builder.client().unwrap();
        assert_eq!(client.get_connection_info().addr.to_string(), "cache.internal:6380");
        assert_eq!(client.get_connection_info().redis.db, 2);
    }

    #[test]
    fn test_invalid_url() {
        let result = RedisStore::builder().url("http://localhost").client();
        assert!(matches!(result, Err(AdapterError::InvalidUrl(_))));
    }

    #[test]
    fn test_builder_connection_options() {
        let builder = RedisStore::builder()
            .connection_retries(1)
            .connection_timeout(Duration::from_millis(250))
            .response_timeout(Duration::from_secs(2));

        assert_eq!(builder.connection_retries, Some(1));
        assert_eq!(builder.connection_timeout, Some(Duration::from_millis(250)));
        assert_eq!(builder.response_timeout, Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_fast() {
        // Port 1 is reserved and nothing listens on it
        let build = RedisStore::builder()
            .url("redis://127.0.0.1:1")
            .connection_retries(0)
            .connection_timeout(Duration::from_millis(500))
            .build();

        let result = tokio::time::timeout(Duration::from_secs(3), build)
            .await
            .expect("build should give up within the configured bounds");
        assert!(matches!(result, Err(AdapterError::Connection(_))));
    }

    #[tokio::test]
    async fn test_default_retries_are_bounded() {
        let build = RedisStore::builder().url("redis://127.0.0.1:1").build();

        let result = tokio::time::timeout(Duration::from_secs(30), build)
            .await
            .expect("default retries should give up well within 30s");
        assert!(matches!(result, Err(AdapterError::Connection(_))));
    }
}
