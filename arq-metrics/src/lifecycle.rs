//! Starting and stopping the exporter.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use crate::config::MetricsConfig;
use crate::gauges::GaugeSet;
use crate::poller::{Poller, PollerState, PollerStatus};
#[cfg(feature = "exposition")]
use crate::server::ExpositionServer;
use crate::store::HealthStore;
use crate::Error;

/// Publishes an arq worker's health check as Prometheus gauges.
///
/// `ArqMetrics` wires a [`HealthStore`], a [`GaugeSet`], the background
/// poller and (optionally) the HTTP exposition server together. Starting it
/// consumes it, so a single instance can only ever run one poller.
///
/// # Example
///
/// ```rust,no_run
/// use arq_metrics::{ArqMetrics, MemoryStore, MetricsConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), arq_metrics::Error> {
///     let config = MetricsConfig::builder()
///         .queue_name("arq:queue")
///         .poll_interval(Duration::from_secs(5))
///         .build()?;
///
///     let store = MemoryStore::new();
///     let handle = ArqMetrics::new(config, store).start().await?;
///
///     // ... the worker runs; metrics are served on http://0.0.0.0:8081/ ...
///
///     handle.stop();
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ArqMetrics<S> {
    config: MetricsConfig,
    store: S,
}

impl<S> ArqMetrics<S>
where
    S: HealthStore + 'static,
{
    /// Create an exporter reading from `store`.
    pub fn new(config: MetricsConfig, store: S) -> Self {
        Self { config, store }
    }

    /// The exporter's configuration.
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Register the gauges, start the exposition server if enabled, and spawn
    /// the poller.
    ///
    /// Fails if the exposition server cannot bind or if the gauges are
    /// already registered in the configured registry. Nothing is spawned and
    /// nothing stays registered in that case, so a corrected configuration
    /// can be started against the same registry.
    pub async fn start(self) -> Result<MetricsHandle, Error> {
        let config = self.config;
        info!("Initializing arq metrics...");
        debug!(queue_name = %config.queue_name(), "queue_name");
        debug!(health_check_key = %config.health_check_key(), "health_check_key");

        let listener = bind_server(&config).await?;
        let gauges = GaugeSet::register(config.registry(), config.namespace())?;
        let server = listener.map(spawn_server);

        let poller = Poller::new(
            self.store,
            config.health_check_key(),
            config.poll_interval(),
            gauges.clone(),
        );
        let status = poller.status();
        let (stop_tx, stop_rx) = watch::channel(false);
        status.set_state(PollerState::Running);
        let task = tokio::spawn(poller.run(stop_rx));

        info!("Init complete!");
        Ok(MetricsHandle {
            stop_tx,
            task,
            status,
            gauges,
            server,
            health_check_key: config.health_check_key().to_string(),
        })
    }
}

#[derive(Debug)]
struct ServerHandle {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

#[cfg(not(feature = "exposition"))]
type ExpositionServer = std::convert::Infallible;

#[cfg(feature = "exposition")]
async fn bind_server(config: &MetricsConfig) -> Result<Option<ExpositionServer>, Error> {
    if !config.enable_exposition() {
        return Ok(None);
    }

    info!("Starting exposition server...");
    let server = ExpositionServer::bind(config.listen_addr(), config.registry().clone()).await?;
    Ok(Some(server))
}

#[cfg(feature = "exposition")]
fn spawn_server(server: ExpositionServer) -> ServerHandle {
    let local_addr = server.local_addr();
    let task = server.spawn();
    info!("Exposition server up and running!");
    ServerHandle { local_addr, task }
}

#[cfg(not(feature = "exposition"))]
async fn bind_server(config: &MetricsConfig) -> Result<Option<ExpositionServer>, Error> {
    if config.enable_exposition() {
        tracing::warn!("Exposition requested but the `exposition` feature is disabled");
    }
    Ok(None)
}

#[cfg(not(feature = "exposition"))]
fn spawn_server(server: ExpositionServer) -> ServerHandle {
    match server {}
}

/// Handle to a running exporter.
///
/// Dropping the handle stops the poller (the exposition server keeps
/// running until the runtime shuts down). Call [`detach`](Self::detach) to
/// let the poller run without holding on to the handle.
#[derive(Debug)]
pub struct MetricsHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    status: Arc<PollerStatus>,
    gauges: GaugeSet,
    server: Option<ServerHandle>,
    health_check_key: String,
}

impl MetricsHandle {
    /// Request the poller to stop.
    ///
    /// Returns immediately without waiting for the poller to exit and leaves
    /// the exposition server running. Safe to call more than once and after
    /// the poller has already stopped on its own.
    pub fn stop(&self) {
        info!("Stopping arq metrics...");
        self.stop_tx.send_replace(true);
        info!("Stop complete!");
    }

    /// Wait for the poller to exit, either after [`stop`](Self::stop) or on
    /// an unexpected store failure.
    ///
    /// Returns an error only if the poller task panicked.
    pub async fn join(self) -> Result<(), JoinError> {
        let MetricsHandle { stop_tx, task, .. } = self;
        let result = task.await;
        drop(stop_tx);
        result
    }

    /// Give up the handle and keep the poller and the exposition server
    /// running for the rest of the runtime's life.
    ///
    /// The poller still ends on its own if the store fails. Must be called
    /// from within a tokio runtime.
    pub fn detach(self) {
        let MetricsHandle { stop_tx, task, .. } = self;
        tokio::spawn(async move {
            task.await.ok();
            drop(stop_tx);
        });
    }

    /// Stop the poller, wait for it to exit, and shut down the exposition
    /// server.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.stop();
        if let Some(server) = &self.server {
            server.task.abort();
        }
        self.join().await
    }

    /// Live view of the poller's state and counters.
    ///
    /// A [`PollerState::Failed`](crate::PollerState::Failed) state means the
    /// poller stopped on an unexpected error and gauges are no longer updated.
    pub fn status(&self) -> &PollerStatus {
        &self.status
    }

    /// Whether the poller is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished() && self.status.is_running()
    }

    /// The gauges being published to.
    pub fn gauges(&self) -> &GaugeSet {
        &self.gauges
    }

    /// Key the health check is read from.
    pub fn health_check_key(&self) -> &str {
        &self.health_check_key
    }

    /// Address of the exposition server, if it was started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.local_addr)
    }
}
