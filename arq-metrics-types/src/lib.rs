//! # arq-metrics-types
//!
//! Core types for arq job queue metrics. arq periodically writes a one-line
//! health-check summary to Redis; this crate defines the structured
//! [`Snapshot`] that summary decodes into, and the parser that performs the
//! decoding.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`Snapshot`] and [`SnapshotField`]
//!
//! ## Example
//!
//! ```rust
//! use arq_metrics_types::{parse, Snapshot};
//!
//! let raw = "Mar-01 17:41:22 j_complete=4 j_failed=8 j_retried=0 j_ongoing=235 queued=119";
//! let snapshot = parse(raw).unwrap();
//!
//! assert_eq!(snapshot.completed, 4);
//! assert_eq!(snapshot.queued, 119);
//!
//! // Snapshots also implement `FromStr`
//! let same: Snapshot = raw.parse().unwrap();
//! assert_eq!(snapshot, same);
//! ```

mod parse;
mod snapshot;

pub use parse::{parse, ParseError};
pub use snapshot::{Snapshot, SnapshotField};
