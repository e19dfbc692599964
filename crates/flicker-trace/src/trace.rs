// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Generic snapshot sequence shared by both trace kinds.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::Timestamp;

/// A single snapshot inside a [`Trace`].
pub trait TraceEntry {
    /// Capture time of this snapshot.
    fn timestamp(&self) -> Timestamp;
}

/// Where a trace came from, carried into failure diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceSource {
    /// File the trace was decoded from.
    pub path: PathBuf,
    /// Lowercase hex BLAKE3 digest of the raw trace bytes.
    pub checksum: String,
}

impl std::fmt::Display for TraceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (checksum {})", self.path.display(), self.checksum)
    }
}

/// Errors raised by trace construction and access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// An operation needed at least one entry and the trace had none.
    #[error("trace is empty")]
    EmptyTrace,

    /// Entry timestamps must be non-decreasing.
    #[error("timestamp went backwards at entry {index}: {previous} -> {current}")]
    NonMonotonicTimestamp {
        /// Index of the offending entry.
        index: usize,
        /// Timestamp of the entry before it.
        previous: Timestamp,
        /// Timestamp of the offending entry.
        current: Timestamp,
    },

    /// The trace bytes were not a valid trace document.
    #[error("failed to decode trace: {0}")]
    Decode(String),

    /// The trace file could not be read.
    #[error("failed to read trace {path}: {message}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error text.
        message: String,
    },
}

/// Ordered, immutable sequence of snapshots of one kind.
///
/// Construction validates that timestamps never decrease, so every accessor
/// can rely on sorted order (range lookups are binary searches).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace<E> {
    entries: Vec<E>,
    #[serde(skip)]
    source: Option<TraceSource>,
}

impl<E> Default for Trace<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            source: None,
        }
    }
}

impl<E: TraceEntry> Trace<E> {
    /// Builds a trace, rejecting entries whose timestamps decrease.
    pub fn new(entries: Vec<E>) -> Result<Self, TraceError> {
        for (index, pair) in entries.windows(2).enumerate() {
            let previous = pair[0].timestamp();
            let current = pair[1].timestamp();
            if current < previous {
                return Err(TraceError::NonMonotonicTimestamp {
                    index: index + 1,
                    previous,
                    current,
                });
            }
        }
        Ok(Self {
            entries,
            source: None,
        })
    }

    /// Returns an empty trace with no provenance.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attaches provenance to this trace.
    #[must_use]
    pub fn with_source(mut self, source: TraceSource) -> Self {
        self.source = Some(source);
        self
    }

    /// All entries in capture order.
    #[must_use]
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// Iterates entries in capture order.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the trace has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries.get(index)
    }

    /// First entry.
    pub fn first(&self) -> Result<&E, TraceError> {
        self.entries.first().ok_or(TraceError::EmptyTrace)
    }

    /// Last entry.
    pub fn last(&self) -> Result<&E, TraceError> {
        self.entries.last().ok_or(TraceError::EmptyTrace)
    }

    /// Entries whose timestamp lies in `[from, to]`.
    ///
    /// Returns an empty slice when `to < from`.
    #[must_use]
    pub fn slice(&self, from: Timestamp, to: Timestamp) -> &[E] {
        if to < from {
            return &[];
        }
        let lo = self.entries.partition_point(|e| e.timestamp() < from);
        let hi = self.entries.partition_point(|e| e.timestamp() <= to);
        &self.entries[lo..hi]
    }

    /// Latest entry captured at or before `at`.
    #[must_use]
    pub fn entry_at(&self, at: Timestamp) -> Option<&E> {
        let idx = self.entries.partition_point(|e| e.timestamp() <= at);
        idx.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Returns `true` if provenance is attached.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Provenance, if attached.
    #[must_use]
    pub fn source(&self) -> Option<&TraceSource> {
        self.source.as_ref()
    }
}

impl<'a, E> IntoIterator for &'a Trace<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// On-disk shape of a trace document: `{"entries": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTrace<E> {
    pub(crate) entries: Vec<E>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tick(i64);

    impl TraceEntry for Tick {
        fn timestamp(&self) -> Timestamp {
            Timestamp(self.0)
        }
    }

    fn trace(ts: &[i64]) -> Trace<Tick> {
        Trace::new(ts.iter().copied().map(Tick).collect()).expect("fixture trace")
    }

    #[test]
    fn rejects_decreasing_timestamps() {
        let err = Trace::new(vec![Tick(1), Tick(5), Tick(3)]).unwrap_err();
        assert_eq!(
            err,
            TraceError::NonMonotonicTimestamp {
                index: 2,
                previous: Timestamp(5),
                current: Timestamp(3),
            }
        );
    }

    #[test]
    fn accepts_equal_timestamps() {
        assert_eq!(trace(&[1, 1, 2]).len(), 3);
    }

    #[test]
    fn first_and_last_fail_on_empty() {
        let empty: Trace<Tick> = Trace::empty();
        assert_eq!(empty.first(), Err(TraceError::EmptyTrace));
        assert_eq!(empty.last(), Err(TraceError::EmptyTrace));
        assert!(empty.is_empty());
    }

    #[test]
    fn slice_is_inclusive() {
        let t = trace(&[10, 20, 30, 40]);
        let s = t.slice(Timestamp(20), Timestamp(30));
        assert_eq!(s, &[Tick(20), Tick(30)]);
        assert!(t.slice(Timestamp(31), Timestamp(39)).is_empty());
        assert!(t.slice(Timestamp(40), Timestamp(10)).is_empty());
    }

    #[test]
    fn entry_at_returns_latest_not_after() {
        let t = trace(&[10, 20, 30]);
        assert_eq!(t.entry_at(Timestamp(5)), None);
        assert_eq!(t.entry_at(Timestamp(10)), Some(&Tick(10)));
        assert_eq!(t.entry_at(Timestamp(25)), Some(&Tick(20)));
        assert_eq!(t.entry_at(Timestamp(99)), Some(&Tick(30)));
    }

    #[test]
    fn provenance_is_optional() {
        let t = trace(&[1]);
        assert!(!t.has_source());
        let t = t.with_source(TraceSource {
            path: PathBuf::from("/tmp/wm_trace.json"),
            checksum: "abc".into(),
        });
        assert!(t.has_source());
        assert_eq!(t.source().map(|s| s.checksum.as_str()), Some("abc"));
    }
}
