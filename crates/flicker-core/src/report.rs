// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Error report and metric map produced by an analysis.
//!
//! Assertion-level problems are data, never Rust errors. Each one becomes an
//! [`ErrorEntry`] classified by [`ErrorKind`]. The [`ErrorReport`] keeps its
//! entries in a canonical order (tag id, timestamp, assertion name) so the
//! serialized `error_trace` artifact is identical regardless of how the work
//! was scheduled.

use std::collections::BTreeMap;
use std::fmt;

use flicker_trace::{Timestamp, TraceSource};
use serde::{Deserialize, Serialize};

use crate::tag::Tag;

/// Classification of report entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The tag covered no snapshot at all.
    EmptyTrace,
    /// A predicate did not hold and fail-fast stopped the scan.
    AssertionFailed,
    /// The tag's snapshots ran out before a group held.
    AssertionGroupExhausted,
    /// A predicate could not complete.
    AssertionCrashed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EmptyTrace => "EMPTY_TRACE",
            Self::AssertionFailed => "ASSERTION_FAILED",
            Self::AssertionGroupExhausted => "ASSERTION_GROUP_EXHAUSTED",
            Self::AssertionCrashed => "ASSERTION_CRASHED",
        };
        write!(f, "{s}")
    }
}

/// One row of the error report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Id of the tag being evaluated.
    pub tag_id: u32,
    /// Name of the tag being evaluated.
    pub tag_name: String,
    /// Assertion involved, when the entry concerns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,
    /// Snapshot timestamp the entry refers to.
    pub timestamp: Timestamp,
    /// Classification.
    pub kind: ErrorKind,
    /// Human-readable reason.
    pub reason: String,
}

impl ErrorEntry {
    /// Creates an entry for `tag`.
    #[must_use]
    pub fn new(tag: &Tag, kind: ErrorKind, timestamp: Timestamp, reason: impl Into<String>) -> Self {
        Self {
            tag_id: tag.id,
            tag_name: tag.name.clone(),
            assertion: None,
            timestamp,
            kind,
            reason: reason.into(),
        }
    }

    /// Attaches the assertion name.
    #[must_use]
    pub fn with_assertion(mut self, name: impl Into<String>) -> Self {
        self.assertion = Some(name.into());
        self
    }

    fn sort_key(&self) -> (u32, Timestamp, &str) {
        (self.tag_id, self.timestamp, self.assertion.as_deref().unwrap_or(""))
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}#{} @ {}", self.kind, self.tag_name, self.tag_id, self.timestamp)?;
        if let Some(assertion) = &self.assertion {
            write!(f, " {assertion}")?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Aggregate counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// `EMPTY_TRACE` entries.
    pub empty_trace: usize,
    /// `ASSERTION_FAILED` entries.
    pub failed: usize,
    /// `ASSERTION_GROUP_EXHAUSTED` entries.
    pub exhausted: usize,
    /// `ASSERTION_CRASHED` entries.
    pub crashed: usize,
}

impl ReportSummary {
    /// Counts the kinds in `entries`.
    #[must_use]
    pub fn from_entries(entries: &[ErrorEntry]) -> Self {
        let mut summary = Self::default();
        for e in entries {
            match e.kind {
                ErrorKind::EmptyTrace => summary.empty_trace += 1,
                ErrorKind::AssertionFailed => summary.failed += 1,
                ErrorKind::AssertionGroupExhausted => summary.exhausted += 1,
                ErrorKind::AssertionCrashed => summary.crashed += 1,
            }
        }
        summary
    }

    /// Total entries.
    #[must_use]
    pub fn total(&self) -> usize {
        self.empty_trace + self.failed + self.exhausted + self.crashed
    }

    /// Returns `true` if nothing was reported.
    #[must_use]
    pub fn is_green(&self) -> bool {
        self.total() == 0
    }
}

/// Every problem found in one analysis, in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    entries: Vec<ErrorEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_source: Option<TraceSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    layers_source: Option<TraceSource>,
}

impl ErrorReport {
    /// Builds a report, sorting `entries` by tag id, timestamp and assertion.
    ///
    /// The sort is stable, so entries with equal keys keep their input order.
    #[must_use]
    pub fn new(mut entries: Vec<ErrorEntry>) -> Self {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self {
            entries,
            window_source: None,
            layers_source: None,
        }
    }

    /// Attaches the provenance of both traces.
    #[must_use]
    pub fn with_sources(
        mut self,
        window: Option<TraceSource>,
        layers: Option<TraceSource>,
    ) -> Self {
        self.window_source = window;
        self.layers_source = layers;
        self
    }

    /// Entries in canonical order.
    #[must_use]
    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    /// Iterates entries.
    pub fn iter(&self) -> std::slice::Iter<'_, ErrorEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the analysis found nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Provenance of the window trace.
    #[must_use]
    pub fn window_source(&self) -> Option<&TraceSource> {
        self.window_source.as_ref()
    }

    /// Provenance of the layer trace.
    #[must_use]
    pub fn layers_source(&self) -> Option<&TraceSource> {
        self.layers_source.as_ref()
    }

    /// Counts by kind.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_entries(&self.entries)
    }
}

impl<'a> IntoIterator for &'a ErrorReport {
    type Item = &'a ErrorEntry;
    type IntoIter = std::slice::Iter<'a, ErrorEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, source) in [
            ("WM", &self.window_source),
            ("Layers", &self.layers_source),
        ] {
            if let Some(source) = source {
                writeln!(f, "{label} trace can be found in: {}", source.path.display())?;
                writeln!(f, "Checksum: {}", source.checksum)?;
            }
        }
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Assertion key to pass (1) / fail (0).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricMap(BTreeMap<String, u8>);

impl MetricMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` as passed or failed, replacing any earlier value.
    pub fn record(&mut self, key: impl Into<String>, passed: bool) {
        self.0.insert(key.into(), u8::from(passed));
    }

    /// Value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u8> {
        self.0.get(key).copied()
    }

    /// Iterates in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing was evaluated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys with value 1.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.0.values().filter(|v| **v == 1).count()
    }

    /// Underlying map.
    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, u8> {
        &self.0
    }
}

impl FromIterator<(String, u8)> for MetricMap {
    fn from_iter<I: IntoIterator<Item = (String, u8)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
