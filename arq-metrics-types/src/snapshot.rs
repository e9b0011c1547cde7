//! Snapshot - a point-in-time reading of an arq worker's job counters.

use std::fmt;

/// One of the five counters carried by an arq health check.
///
/// The declaration order matches the order in which arq writes the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SnapshotField {
    /// Jobs that finished successfully (`j_complete`).
    Completed,
    /// Jobs that raised (`j_failed`).
    Failed,
    /// Jobs that were retried (`j_retried`).
    Retried,
    /// Jobs currently running (`j_ongoing`).
    Ongoing,
    /// Jobs waiting in the queue (`queued`).
    Queued,
}

impl SnapshotField {
    /// All fields, in health-check order.
    pub const ALL: [SnapshotField; 5] = [
        SnapshotField::Completed,
        SnapshotField::Failed,
        SnapshotField::Retried,
        SnapshotField::Ongoing,
        SnapshotField::Queued,
    ];

    /// Gauge name (without namespace) this field is published under.
    pub const fn gauge_name(self) -> &'static str {
        match self {
            SnapshotField::Completed => "jobs_completed",
            SnapshotField::Failed => "jobs_failed",
            SnapshotField::Retried => "jobs_retried",
            SnapshotField::Ongoing => "jobs_ongoing",
            SnapshotField::Queued => "queued_inprogress",
        }
    }

    /// Help text for the gauge.
    pub const fn help(self) -> &'static str {
        match self {
            SnapshotField::Completed => "The number of jobs completed.",
            SnapshotField::Failed => "The total number of errored jobs.",
            SnapshotField::Retried => "The total number of retried jobs.",
            SnapshotField::Ongoing => "The number of jobs in progress.",
            SnapshotField::Queued => "The number of jobs waiting in the queue.",
        }
    }

    /// Tag preceding this field's value in the raw health-check string.
    pub const fn tag(self) -> &'static str {
        match self {
            SnapshotField::Completed => "j_complete",
            SnapshotField::Failed => "j_failed",
            SnapshotField::Retried => "j_retried",
            SnapshotField::Ongoing => "j_ongoing",
            SnapshotField::Queued => "queued",
        }
    }
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A point-in-time reading of an arq worker's job counters.
///
/// Snapshots are produced by [`parse`](crate::parse) from the health-check
/// string arq stores in Redis, published once to a set of gauges, and then
/// discarded. No history is kept.
///
/// # Example
///
/// ```rust
/// use arq_metrics_types::{Snapshot, SnapshotField};
///
/// let snapshot = Snapshot::new(10, 2, 1, 3, 40);
///
/// assert_eq!(snapshot.get(SnapshotField::Queued), 40);
/// assert_eq!(snapshot.iter().count(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Jobs completed.
    pub completed: u64,
    /// Jobs failed.
    pub failed: u64,
    /// Jobs retried.
    pub retried: u64,
    /// Jobs in progress.
    pub ongoing: u64,
    /// Jobs queued.
    pub queued: u64,
}

impl Snapshot {
    /// Create a snapshot from the five counters, in health-check order.
    pub const fn new(completed: u64, failed: u64, retried: u64, ongoing: u64, queued: u64) -> Self {
        Self {
            completed,
            failed,
            retried,
            ongoing,
            queued,
        }
    }

    /// Value of a single counter.
    pub const fn get(&self, field: SnapshotField) -> u64 {
        match field {
            SnapshotField::Completed => self.completed,
            SnapshotField::Failed => self.failed,
            SnapshotField::Retried => self.retried,
            SnapshotField::Ongoing => self.ongoing,
            SnapshotField::Queued => self.queued,
        }
    }

    /// Iterate over `(field, value)` pairs in health-check order.
    pub fn iter(&self) -> impl Iterator<Item = (SnapshotField, u64)> + '_ {
        SnapshotField::ALL.into_iter().map(|f| (f, self.get(f)))
    }
}

impl fmt::Display for Snapshot {
    /// Formats the snapshot the way arq writes it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, value) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{}={}", field.tag(), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_matches_fields() {
        let snapshot = Snapshot::new(1, 2, 3, 4, 5);

        assert_eq!(snapshot.get(SnapshotField::Completed), 1);
        assert_eq!(snapshot.get(SnapshotField::Failed), 2);
        assert_eq!(snapshot.get(SnapshotField::Retried), 3);
        assert_eq!(snapshot.get(SnapshotField::Ongoing), 4);
        assert_eq!(snapshot.get(SnapshotField::Queued), 5);
    }

    #[test]
    fn test_iter_is_in_health_check_order() {
        let snapshot = Snapshot::new(10, 20, 30, 40, 50);
        let pairs: Vec<_> = snapshot.iter().collect();

        assert_eq!(
            pairs,
            vec![
                (SnapshotField::Completed, 10),
                (SnapshotField::Failed, 20),
                (SnapshotField::Retried, 30),
                (SnapshotField::Ongoing, 40),
                (SnapshotField::Queued, 50),
            ]
        );
    }

    #[test]
    fn test_gauge_names() {
        let names: Vec<_> = SnapshotField::ALL.iter().map(|f| f.gauge_name()).collect();
        assert_eq!(
            names,
            vec![
                "jobs_completed",
                "jobs_failed",
                "jobs_retried",
                "jobs_ongoing",
                "queued_inprogress"
            ]
        );
    }

    #[test]
    fn test_display_uses_health_check_format() {
        let snapshot = Snapshot::new(4, 8, 0, 235, 119);
        assert_eq!(
            snapshot.to_string(),
            "j_complete=4 j_failed=8 j_retried=0 j_ongoing=235 queued=119"
        );
    }

    #[test]
    fn test_default_is_all_zero() {
        let snapshot = Snapshot::default();
        assert!(snapshot.iter().all(|(_, v)| v == 0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_field_names() {
        let snapshot = Snapshot::new(1, 0, 0, 2, 3);
        let json = serde_json::to_value(snapshot).unwrap();

        assert_eq!(json["completed"], 1);
        assert_eq!(json["ongoing"], 2);
        assert_eq!(json["queued"], 3);
    }
}
