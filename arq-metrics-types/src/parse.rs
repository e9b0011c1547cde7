//! Health-check string parsing.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::{Snapshot, SnapshotField};

/// Counters must appear in this order, separated by whitespace. The match is a
/// search rather than a full match because arq prefixes the counters with a
/// timestamp.
static HEALTH_CHECK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"j_complete=(?P<completed>[0-9]+)\s+j_failed=(?P<failed>[0-9]+)\s+j_retried=(?P<retried>[0-9]+)\s+j_ongoing=(?P<ongoing>[0-9]+)\s+queued=(?P<queued>[0-9]+)",
    )
    .unwrap()
});

/// Errors that can occur when decoding a health-check string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The string does not contain the five counters in the expected layout.
    ///
    /// This includes a string where any single counter is empty or
    /// non-numeric: decoding is all-or-nothing.
    #[error("health check does not match `j_complete=<n> j_failed=<n> j_retried=<n> j_ongoing=<n> queued=<n>`")]
    NoMatch,

    /// A counter is well-formed but does not fit in a `u64`.
    #[error("health check counter `{field}` is out of range")]
    Overflow {
        /// The counter that overflowed.
        field: SnapshotField,
    },
}

/// Decode a raw arq health-check string into a [`Snapshot`].
///
/// # Example
///
/// ```rust
/// use arq_metrics_types::{parse, ParseError};
///
/// let snapshot = parse("j_complete=3 j_failed=40 j_retried=100 j_ongoing=0 queued=0").unwrap();
/// assert_eq!(snapshot.failed, 40);
///
/// // A single empty counter rejects the whole message
/// let err = parse("j_complete=3 j_failed= j_retried=100 j_ongoing=0 queued=0").unwrap_err();
/// assert_eq!(err, ParseError::NoMatch);
/// ```
pub fn parse(raw: &str) -> Result<Snapshot, ParseError> {
    let captures = HEALTH_CHECK_REGEX
        .captures(raw)
        .ok_or(ParseError::NoMatch)?;

    let value = |field: SnapshotField, group: &str| -> Result<u64, ParseError> {
        captures[group]
            .parse()
            .map_err(|_| ParseError::Overflow { field })
    };

    Ok(Snapshot {
        completed: value(SnapshotField::Completed, "completed")?,
        failed: value(SnapshotField::Failed, "failed")?,
        retried: value(SnapshotField::Retried, "retried")?,
        ongoing: value(SnapshotField::Ongoing, "ongoing")?,
        queued: value(SnapshotField::Queued, "queued")?,
    })
}

impl FromStr for Snapshot {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_zero() {
        let snapshot = parse("j_complete=0 j_failed=0 j_retried=0 j_ongoing=0 queued=0").unwrap();
        assert_eq!(snapshot, Snapshot::new(0, 0, 0, 0, 0));
    }

    #[test]
    fn test_parse_single_counter() {
        let snapshot = parse("j_complete=3 j_failed=0 j_retried=0 j_ongoing=0 queued=0").unwrap();
        assert_eq!(snapshot, Snapshot::new(3, 0, 0, 0, 0));
    }

    #[test]
    fn test_parse_several_counters() {
        let snapshot =
            parse("j_complete=3 j_failed=40 j_retried=100 j_ongoing=0 queued=0").unwrap();
        assert_eq!(snapshot, Snapshot::new(3, 40, 100, 0, 0));
    }

    #[test]
    fn test_parse_with_arq_timestamp_prefix() {
        let snapshot =
            parse("Mar-01 17:41:22 j_complete=4 j_failed=8 j_retried=0 j_ongoing=235 queued=119")
                .unwrap();
        assert_eq!(snapshot, Snapshot::new(4, 8, 0, 235, 119));
    }

    #[test]
    fn test_parse_arbitrary_whitespace() {
        let snapshot =
            parse("j_complete=1\tj_failed=2   j_retried=3\nj_ongoing=4  queued=5").unwrap();
        assert_eq!(snapshot, Snapshot::new(1, 2, 3, 4, 5));
    }

    #[test]
    fn test_parse_rejects_one_empty_counter() {
        assert_eq!(
            parse("j_complete=3 j_failed= j_retried=100 j_ongoing=0 queued=0"),
            Err(ParseError::NoMatch)
        );
    }

    #[test]
    fn test_parse_rejects_all_empty_counters() {
        assert_eq!(
            parse("j_complete= j_failed= j_retried= j_ongoing= queued="),
            Err(ParseError::NoMatch)
        );
    }

    #[test]
    fn test_parse_rejects_signs_and_separators() {
        assert!(parse("j_complete=-1 j_failed=0 j_retried=0 j_ongoing=0 queued=0").is_err());
        assert!(parse("j_complete=1,000 j_failed=0 j_retried=0 j_ongoing=0 queued=0").is_err());
    }

    #[test]
    fn test_parse_rejects_reordered_counters() {
        assert_eq!(
            parse("j_failed=0 j_complete=0 j_retried=0 j_ongoing=0 queued=0"),
            Err(ParseError::NoMatch)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse(""), Err(ParseError::NoMatch));
        assert_eq!(parse("not a health check"), Err(ParseError::NoMatch));
    }

    #[test]
    fn test_parse_overflow() {
        let raw = "j_complete=0 j_failed=0 j_retried=0 j_ongoing=99999999999999999999999 queued=0";
        assert_eq!(
            parse(raw),
            Err(ParseError::Overflow {
                field: SnapshotField::Ongoing
            })
        );
    }

    #[test]
    fn test_parse_matches_display() {
        let snapshot = Snapshot::new(17, 2, 5, 9, 1024);
        assert_eq!(parse(&snapshot.to_string()), Ok(snapshot));
    }

    #[test]
    fn test_from_str() {
        let snapshot: Snapshot = "j_complete=1 j_failed=0 j_retried=0 j_ongoing=0 queued=4"
            .parse()
            .unwrap();
        assert_eq!(snapshot.queued, 4);
    }

    #[test]
    fn test_error_messages() {
        assert!(ParseError::NoMatch.to_string().contains("does not match"));
        let err = ParseError::Overflow {
            field: SnapshotField::Queued,
        };
        assert_eq!(err.to_string(), "health check counter `queued` is out of range");
    }
}
