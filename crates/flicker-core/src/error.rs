// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structural errors that stop an analysis before it starts.
//!
//! Assertion-level problems are never reported through this type; they end
//! up as [`crate::ErrorEntry`] rows in the report.

use thiserror::Error;

/// Configuration problems detected when building an engine or service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// An assertion was declared without a name.
    #[error("assertion name must not be empty")]
    EmptyAssertionName,

    /// Two assertions share a name, which would make metric keys ambiguous.
    #[error("duplicate assertion name `{0}`")]
    DuplicateAssertion(String),

    /// An assertion does not list any tag it applies to.
    #[error("assertion `{0}` does not apply to any tag")]
    UntaggedAssertion(String),

    /// A declarative check is malformed.
    #[error("invalid check `{name}`: {reason}")]
    InvalidCheck {
        /// Assertion name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}
