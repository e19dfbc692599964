// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot timestamps.

use serde::{Deserialize, Serialize};

/// Elapsed time of a snapshot, in nanoseconds since capture boot.
///
/// This newtype keeps timestamps from being mixed up with indices or counts
/// across APIs. Ordering is the plain integer ordering.
#[repr(transparent)]
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Smallest representable timestamp.
    pub const MIN: Self = Self(i64::MIN);
    /// Largest representable timestamp.
    pub const MAX: Self = Self(i64::MAX);

    /// Creates a timestamp from elapsed nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Returns the elapsed nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(nanos: i64) -> Self {
        Self(nanos)
    }
}
