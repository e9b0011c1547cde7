//! Error types.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced while configuring or starting the metrics exporter.
#[derive(Debug, Error)]
pub enum Error {
    /// The poll interval must be strictly positive.
    #[error("poll interval must be greater than zero (got {0:?})")]
    InvalidInterval(Duration),

    /// The bind address/port pair is not a valid socket address.
    #[error("invalid exposition address `{0}`")]
    InvalidAddress(String),

    /// A duration setting could not be parsed.
    #[error("invalid duration `{0}`")]
    InvalidDuration(String),

    /// Layered configuration (file or environment) could not be loaded.
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// Gauge creation or registration failed, e.g. the registry already holds
    /// gauges with the same names.
    #[error("failed to register gauges: {0}")]
    Registry(#[from] prometheus::Error),

    /// The exposition server could not bind its listener.
    #[error("failed to bind exposition server on {addr}: {source}")]
    Bind {
        /// Address the server tried to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Error returned by a [`HealthStore`](crate::HealthStore) read.
///
/// Any store error is unexpected from the poller's point of view: it ends the
/// current poll run.
#[derive(Debug, Error)]
#[error("health store read failed: {source}")]
pub struct StoreError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl StoreError {
    /// Wrap a backend error.
    pub fn new<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            source: source.into(),
        }
    }

    /// Create a store error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_message() {
        let err = StoreError::msg("connection reset");
        assert_eq!(err.to_string(), "health store read failed: connection reset");
    }

    #[test]
    fn test_store_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err = StoreError::new(io);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_interval_message() {
        let err = Error::InvalidInterval(Duration::ZERO);
        assert!(err.to_string().contains("greater than zero"));
    }
}
