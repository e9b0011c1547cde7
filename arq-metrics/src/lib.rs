//! # arq-metrics
//!
//! Publishes the health check of an [arq](https://github.com/samuelcolvin/arq)
//! worker as Prometheus gauges.
//!
//! arq periodically writes a line such as
//! `j_complete=4 j_failed=8 j_retried=0 j_ongoing=235 queued=119` to the key
//! `<queue_name>:health-check`. This crate polls that key, parses the counters
//! and exposes them as five gauges, optionally served over HTTP.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arq_metrics::{ArqMetrics, MemoryStore, MetricsConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), arq_metrics::Error> {
//!     let config = MetricsConfig::builder()
//!         .queue_name("arq:queue")
//!         .poll_interval(Duration::from_secs(5))
//!         .port(8081)
//!         .build()?;
//!
//!     // Any HealthStore works; arq-metrics-adapters provides a Redis one
//!     let store = MemoryStore::new();
//!
//!     // Keep the handle: dropping it stops the poller. Use
//!     // `handle.detach()` to keep polling without holding on to it.
//!     let handle = ArqMetrics::new(config, store).start().await?;
//!
//!     // ... the worker runs ...
//!
//!     handle.shutdown().await.ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Gauges
//!
//! | Gauge                   | Health-check field |
//! |-------------------------|--------------------|
//! | `arq_jobs_completed`    | `j_complete`       |
//! | `arq_jobs_failed`       | `j_failed`         |
//! | `arq_jobs_retried`      | `j_retried`        |
//! | `arq_jobs_ongoing`      | `j_ongoing`        |
//! | `arq_queued_inprogress` | `queued`           |
//!
//! ## Features
//!
//! - `exposition` (default): serve the registry over HTTP with hyper

mod config;
mod duration;
mod error;
mod gauges;
mod lifecycle;
mod poller;
mod store;

#[cfg(feature = "exposition")]
pub mod server;

pub use config::{
    MetricsConfig, MetricsConfigBuilder, DEFAULT_ADDR, DEFAULT_NAMESPACE, DEFAULT_POLL_INTERVAL,
    DEFAULT_PORT, DEFAULT_QUEUE_NAME, ENV_PREFIX, HEALTH_CHECK_KEY_SUFFIX,
};
pub use duration::parse_duration;
pub use error::{Error, StoreError};
pub use gauges::GaugeSet;
pub use lifecycle::{ArqMetrics, MetricsHandle};
pub use poller::{Poller, PollerState, PollerStatus, TickOutcome};
pub use store::{HealthStore, MemoryStore};

// Re-export types for convenience
pub use arq_metrics_types::{parse, ParseError, Snapshot, SnapshotField};
