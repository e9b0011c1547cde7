//! The poll-parse-publish loop.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arq_metrics_types::{parse, ParseError, Snapshot};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::gauges::GaugeSet;
use crate::store::HealthStore;
use crate::StoreError;

/// Result of a single successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The health check was parsed and the gauges were updated.
    Published(Snapshot),
    /// The health-check key does not exist (yet).
    KeyAbsent,
    /// The stored value could not be decoded; gauges were left unchanged.
    Unparsable(ParseError),
}

/// Lifecycle state of a poller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollerState {
    /// Not started yet.
    #[default]
    Idle,
    /// The loop is running.
    Running,
    /// The loop exited after a stop request.
    Cancelled,
    /// The loop exited on an unexpected error. It is not restarted.
    Failed {
        /// Description of the error that ended the loop.
        error: String,
    },
}

/// Shared, live view of a poller's progress.
///
/// The poller task is the only writer.
#[derive(Debug, Default)]
pub struct PollerStatus {
    state: RwLock<PollerState>,
    last_snapshot: RwLock<Option<Snapshot>>,
    reads: AtomicU64,
    published: AtomicU64,
    absent: AtomicU64,
    unparsable: AtomicU64,
}

impl PollerStatus {
    /// Current lifecycle state.
    pub fn state(&self) -> PollerState {
        self.state.read().clone()
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        *self.state.read() == PollerState::Running
    }

    /// Number of store reads attempted.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of snapshots published to the gauges.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Number of reads that found no health-check key.
    pub fn absent(&self) -> u64 {
        self.absent.load(Ordering::Relaxed)
    }

    /// Number of reads whose value could not be parsed.
    pub fn unparsable(&self) -> u64 {
        self.unparsable.load(Ordering::Relaxed)
    }

    /// The most recently published snapshot.
    pub fn last_snapshot(&self) -> Option<Snapshot> {
        *self.last_snapshot.read()
    }

    pub(crate) fn set_state(&self, state: PollerState) {
        *self.state.write() = state;
    }
}

/// Repeatedly reads the health check, parses it and publishes it.
///
/// Each tick sleeps for the poll interval *before* reading, so a freshly
/// started worker has time to write its first health check.
pub struct Poller<S> {
    store: S,
    key: String,
    interval: Duration,
    gauges: GaugeSet,
    status: Arc<PollerStatus>,
}

impl<S: HealthStore> Poller<S> {
    /// Create a poller reading `key` from `store` every `interval`.
    pub fn new(store: S, key: impl Into<String>, interval: Duration, gauges: GaugeSet) -> Self {
        Self {
            store,
            key: key.into(),
            interval,
            gauges,
            status: Arc::new(PollerStatus::default()),
        }
    }

    /// Shared status handle, updated while the poller runs.
    pub fn status(&self) -> Arc<PollerStatus> {
        self.status.clone()
    }

    /// Read, parse and publish once, without sleeping.
    ///
    /// A missing key and an unparsable value are reported as outcomes and
    /// logged; only a store failure is an error.
    pub async fn tick(&self) -> Result<TickOutcome, StoreError> {
        self.status.reads.fetch_add(1, Ordering::Relaxed);

        let Some(raw) = self.store.get(&self.key).await? else {
            self.status.absent.fetch_add(1, Ordering::Relaxed);
            warn!(
                key = %self.key,
                "Health check key could not be read, value is absent. Possible causes: \
                 the worker has not written the health check yet, or the \
                 `health_check_key`/`queue_name` settings are wrong. Retrying..."
            );
            return Ok(TickOutcome::KeyAbsent);
        };
        debug!(key = %self.key, raw = %raw, "Read health check");

        match parse(&raw) {
            Ok(snapshot) => {
                self.gauges.publish(&snapshot);
                *self.status.last_snapshot.write() = Some(snapshot);
                self.status.published.fetch_add(1, Ordering::Relaxed);
                Ok(TickOutcome::Published(snapshot))
            }
            Err(e) => {
                self.status.unparsable.fetch_add(1, Ordering::Relaxed);
                warn!(key = %self.key, raw = %raw, error = %e, "Unexpected health check value");
                Ok(TickOutcome::Unparsable(e))
            }
        }
    }

    /// Run the loop until a stop is requested or the store fails.
    ///
    /// A stop is requested by sending `true` on the watch channel or by
    /// dropping its sender. The stop signal is raced against both the sleep
    /// and the in-flight read, so a hanging read does not delay it.
    pub async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let _guard = PanicGuard(&self.status);
        self.status.set_state(PollerState::Running);
        debug!(key = %self.key, interval = ?self.interval, "Starting health check poller");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = stop_requested(&mut stop_rx) => break,
            }
            debug!(interval = ?self.interval, "Gathering metrics");

            let outcome = tokio::select! {
                outcome = self.tick() => outcome,
                _ = stop_requested(&mut stop_rx) => break,
            };

            if let Err(e) = outcome {
                error!(key = %self.key, error = %e, "Health check poller stopped");
                self.status.set_state(PollerState::Failed {
                    error: e.to_string(),
                });
                return;
            }
        }

        info!(key = %self.key, "Health check poller cancelled");
        self.status.set_state(PollerState::Cancelled);
    }
}

impl<S> fmt::Debug for Poller<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("key", &self.key)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Resolves once `true` has been sent or the sender is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    while !*stop_rx.borrow_and_update() {
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Marks the status as failed if the loop unwinds.
struct PanicGuard<'a>(&'a PollerStatus);

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.set_state(PollerState::Failed {
                error: "poller panicked".to_string(),
            });
        }
    }
}
