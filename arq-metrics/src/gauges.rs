//! The five gauges arq health checks are published to.

use arq_metrics_types::{Snapshot, SnapshotField};
use prometheus::{IntGauge, Opts, Registry};

use crate::Error;

/// Gauges for each [`SnapshotField`], registered against a Prometheus registry.
///
/// Gauge names are `<namespace>_<field>`, e.g. `arq_jobs_completed`.
/// Publishing overwrites every gauge; a snapshot is never merged with the
/// previous one.
#[derive(Debug, Clone)]
pub struct GaugeSet {
    completed: IntGauge,
    failed: IntGauge,
    retried: IntGauge,
    ongoing: IntGauge,
    queued: IntGauge,
}

impl GaugeSet {
    /// Create the gauges and register them against `registry`.
    ///
    /// Fails with [`Error::Registry`] if the registry already has gauges with
    /// these names, which means two exporters were configured against the
    /// same registry and namespace. On failure the registry is left as it
    /// was: gauges registered before the collision are removed again.
    pub fn register(registry: &Registry, namespace: &str) -> Result<Self, Error> {
        let gauge = |field: SnapshotField| -> Result<IntGauge, Error> {
            let mut opts = Opts::new(field.gauge_name(), field.help());
            if !namespace.is_empty() {
                opts = opts.namespace(namespace);
            }
            Ok(IntGauge::with_opts(opts)?)
        };

        let gauges = Self {
            completed: gauge(SnapshotField::Completed)?,
            failed: gauge(SnapshotField::Failed)?,
            retried: gauge(SnapshotField::Retried)?,
            ongoing: gauge(SnapshotField::Ongoing)?,
            queued: gauge(SnapshotField::Queued)?,
        };

        let mut registered = Vec::with_capacity(SnapshotField::ALL.len());
        for field in SnapshotField::ALL {
            if let Err(e) = registry.register(Box::new(gauges.gauge(field).clone())) {
                for done in registered {
                    registry.unregister(Box::new(gauges.gauge(done).clone())).ok();
                }
                return Err(e.into());
            }
            registered.push(field);
        }

        Ok(gauges)
    }

    /// Remove the gauges from `registry`.
    pub fn unregister(&self, registry: &Registry) {
        for field in SnapshotField::ALL {
            registry.unregister(Box::new(self.gauge(field).clone())).ok();
        }
    }

    /// Overwrite all gauges with the values of `snapshot`.
    pub fn publish(&self, snapshot: &Snapshot) {
        for (field, value) in snapshot.iter() {
            self.gauge(field).set(clamp(value));
        }
    }

    /// Read the gauges back into a snapshot.
    pub fn current(&self) -> Snapshot {
        let value = |field| self.gauge(field).get().max(0) as u64;
        Snapshot {
            completed: value(SnapshotField::Completed),
            failed: value(SnapshotField::Failed),
            retried: value(SnapshotField::Retried),
            ongoing: value(SnapshotField::Ongoing),
            queued: value(SnapshotField::Queued),
        }
    }

    fn gauge(&self, field: SnapshotField) -> &IntGauge {
        match field {
            SnapshotField::Completed => &self.completed,
            SnapshotField::Failed => &self.failed,
            SnapshotField::Retried => &self.retried,
            SnapshotField::Ongoing => &self.ongoing,
            SnapshotField::Queued => &self.queued,
        }
    }
}

// IntGauge is backed by an i64.
fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
