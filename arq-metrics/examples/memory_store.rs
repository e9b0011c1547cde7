//! Example: Exporting a simulated arq worker
//!
//! Runs the exporter against an in-memory store that a background task
//! updates the way an arq worker refreshes its health check.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=arq_metrics=debug cargo run -p arq-metrics --example memory_store
//! curl http://127.0.0.1:8081/
//! ```

use std::time::Duration;

use arq_metrics::{ArqMetrics, MemoryStore, MetricsConfig, Snapshot};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = MetricsConfig::builder()
        .poll_interval(Duration::from_secs(1))
        .addr("127.0.0.1")
        .build()?;
    let key = config.health_check_key().to_string();

    let store = MemoryStore::new();
    let worker = store.clone();
    tokio::spawn(async move {
        let mut snapshot = Snapshot::default();
        loop {
            snapshot.completed += 3;
            snapshot.failed += u64::from(snapshot.completed % 7 == 0);
            snapshot.ongoing = snapshot.completed % 5;
            snapshot.queued = 20 - snapshot.completed % 20;
            worker.set(&key, snapshot.to_string());
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    let handle = ArqMetrics::new(config, store).start().await?;
    println!("Serving metrics on http://{}/", handle.local_addr().ok_or("exposition disabled")?);
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    handle.shutdown().await?;
    Ok(())
}
