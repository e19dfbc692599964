// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Assertions and the [`Check`] seam the checker evaluates through.
//!
//! Two concrete shapes exist:
//!
//! - [`Assertion<S>`]: a named predicate over one subject type, used by the
//!   fluent trace subjects.
//! - [`AssertionDescriptor`]: a named predicate over a [`FrameSubject`] that
//!   also declares which tag names it applies to. This is what the
//!   [`crate::AssertionEngine`] runs.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::frame::{FrameSubject, SnapshotKind};

/// Why a predicate did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    /// The state under test violates the assertion.
    #[error("{reason}")]
    Failed {
        /// Human-readable reason.
        reason: String,
    },

    /// The predicate itself could not complete.
    #[error("assertion crashed: {message}")]
    Crashed {
        /// What went wrong inside the predicate.
        message: String,
    },
}

impl AssertionError {
    /// Builds a [`AssertionError::Failed`].
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Builds a [`AssertionError::Crashed`].
    #[must_use]
    pub fn crashed(message: impl Into<String>) -> Self {
        Self::Crashed {
            message: message.into(),
        }
    }

    /// Returns `true` for [`AssertionError::Crashed`].
    #[must_use]
    pub fn is_crash(&self) -> bool {
        matches!(self, Self::Crashed { .. })
    }

    /// Reason or crash message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Failed { reason } => reason,
            Self::Crashed { message } => message,
        }
    }
}

/// `Ok(())` when `condition` holds, otherwise a failure built from `reason`.
pub fn ensure(condition: bool, reason: impl FnOnce() -> String) -> Result<(), AssertionError> {
    if condition {
        Ok(())
    } else {
        Err(AssertionError::failed(reason()))
    }
}

/// Anything the checker can evaluate against a subject of type `S`.
pub trait Check<S: ?Sized> {
    /// Assertion name used in reports and metrics.
    fn name(&self) -> &str;

    /// Evaluates the assertion against one subject.
    fn evaluate(&self, subject: &S) -> Result<(), AssertionError>;
}

impl<S: ?Sized, T: Check<S> + ?Sized> Check<S> for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn evaluate(&self, subject: &S) -> Result<(), AssertionError> {
        (**self).evaluate(subject)
    }
}

type Predicate<S> = dyn Fn(&S) -> Result<(), AssertionError> + Send + Sync;

/// Named predicate over a single subject type.
pub struct Assertion<S: ?Sized> {
    name: String,
    predicate: Arc<Predicate<S>>,
}

impl<S: ?Sized> Assertion<S> {
    /// Wraps `predicate` under `name`.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&S) -> Result<(), AssertionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }
}

impl<S: ?Sized> Clone for Assertion<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<S: ?Sized> fmt::Debug for Assertion<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertion")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<S: ?Sized> Check<S> for Assertion<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, subject: &S) -> Result<(), AssertionError> {
        (self.predicate)(subject)
    }
}

type FramePredicate =
    dyn for<'a> Fn(&FrameSubject<'a>) -> Result<(), AssertionError> + Send + Sync;

/// A named frame predicate plus the tag names it applies to.
///
/// Descriptors are shared read-only across tags and worker threads; the
/// predicate must be pure.
#[derive(Clone)]
pub struct AssertionDescriptor {
    name: String,
    tags: Vec<String>,
    reads: Option<SnapshotKind>,
    predicate: Arc<FramePredicate>,
}

impl AssertionDescriptor {
    /// Creates a descriptor applying to every tag named in `tags`.
    pub fn new<I, T, F>(name: impl Into<String>, tags: I, predicate: F) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
        F: for<'a> Fn(&FrameSubject<'a>) -> Result<(), AssertionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            reads: None,
            predicate: Arc::new(predicate),
        }
    }

    /// Declares that the predicate only reads snapshots of `kind`.
    ///
    /// A plan whose descriptors all read the same kind is evaluated over
    /// that trace's own entries instead of every composite frame.
    #[must_use]
    pub fn reading(mut self, kind: SnapshotKind) -> Self {
        self.reads = Some(kind);
        self
    }

    /// Snapshot kind the predicate is limited to, if declared.
    #[must_use]
    pub fn reads(&self) -> Option<SnapshotKind> {
        self.reads
    }

    /// Descriptor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag names this descriptor is evaluated under.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns `true` if the descriptor is declared for `tag_name`.
    #[must_use]
    pub fn applies_to(&self, tag_name: &str) -> bool {
        self.tags.iter().any(|t| t == tag_name)
    }
}

impl fmt::Debug for AssertionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionDescriptor")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("reads", &self.reads)
            .finish_non_exhaustive()
    }
}

impl<'a> Check<FrameSubject<'a>> for AssertionDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, subject: &FrameSubject<'a>) -> Result<(), AssertionError> {
        (self.predicate)(subject)
    }
}
