//! Error types for adapters.

use arq_metrics::StoreError;
use thiserror::Error;

/// Errors that can occur when talking to a health store backend.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The connection URL could not be understood.
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// Connection failed or was lost.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The server rejected or failed a command.
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<AdapterError> for StoreError {
    fn from(err: AdapterError) -> Self {
        StoreError::new(err)
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for AdapterError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            AdapterError::Connection(err.to_string())
        } else {
            AdapterError::Command(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_store_error_keeps_message() {
        let err: StoreError = AdapterError::Connection("connection refused".to_string()).into();
        assert!(err.to_string().contains("Connection failed: connection refused"));
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_redis_error_classification() {
        let io = redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(AdapterError::from(io), AdapterError::Connection(_)));

        let typed = redis::RedisError::from((redis::ErrorKind::TypeError, "not a string"));
        assert!(matches!(AdapterError::from(typed), AdapterError::Command(_)));
    }
}
