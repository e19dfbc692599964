// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named intervals of interest within a pair of traces.

use flicker_trace::Timestamp;
use serde::{Deserialize, Serialize};

/// A named interval (a point when `start == end`) produced by tagging.
///
/// Tags are independent of any assertion: assertions declare which tag names
/// they apply to and are evaluated over the snapshots inside `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Stable sequential identifier within one [`TagTrace`].
    pub id: u32,
    /// Rule name that produced the tag (e.g. `layer-visibility`).
    pub name: String,
    /// First snapshot timestamp covered.
    pub start: Timestamp,
    /// Last snapshot timestamp covered.
    pub end: Timestamp,
}

impl Tag {
    /// Creates a tag.
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, start: Timestamp, end: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            start,
            end,
        }
    }

    /// `"<name>#<id>"`, unique within a tag trace.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}#{}", self.name, self.id)
    }

    /// Returns `true` if `at` falls inside the tag interval.
    #[must_use]
    pub fn contains(&self, at: Timestamp) -> bool {
        self.start <= at && at <= self.end
    }

    /// Returns `true` for zero-length tags.
    #[must_use]
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{} .. {}]", self.key(), self.start, self.end)
    }
}

/// Ordered list of tags for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTrace {
    tags: Vec<Tag>,
}

impl TagTrace {
    /// Wraps tags in the given order.
    #[must_use]
    pub fn new(tags: Vec<Tag>) -> Self {
        Self { tags }
    }

    /// All tags.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Iterates tags in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    /// Tag at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.tags.get(index)
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if no tag was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags carrying `name`, in order.
    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |t| t.name == name)
    }
}

impl<'a> IntoIterator for &'a TagTrace {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}
