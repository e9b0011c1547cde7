//! # arq-metrics-adapters
//!
//! Ready-made [`HealthStore`](arq_metrics::HealthStore) backends for
//! arq-metrics.
//!
//! ## Supported Stores
//!
//! - **Redis** (`redis` feature, on by default) - the store arq itself uses
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arq_metrics::{ArqMetrics, MetricsConfig};
//! use arq_metrics_adapters::redis::RedisStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisStore::builder()
//!         .url("redis://localhost:6379")
//!         .build()
//!         .await?;
//!
//!     let handle = ArqMetrics::new(MetricsConfig::builder().build()?, store)
//!         .start()
//!         .await?;
//!
//!     handle.join().await?;
//!     Ok(())
//! }
//! ```

pub mod error;

#[cfg(feature = "redis")]
pub mod redis;

pub use error::AdapterError;
