// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Temporal assertion engine for flicker trace analysis.
//!
//! Given a window-hierarchy trace and a layer trace, this crate finds the
//! intervals worth checking ([`tagging`]) and decides, snapshot by snapshot,
//! whether ordered groups of assertions hold inside each interval
//! ([`checker`], [`engine`]). Results come back as data: an [`ErrorReport`]
//! and a [`MetricMap`].
//!
//! # Architecture
//!
//! ```text
//! WindowManagerTrace ─┐
//!                     ├─ frame::merge_frames ─ TaggingEngine ─ TagTrace ─┐
//! LayersTrace ────────┘                                                   ├─ AssertionEngine ─ (ErrorReport, MetricMap)
//!                                    AssertionPlan (groups of descriptors) ┘
//! ```
//!
//! # Modules
//!
//! - [`assertion`]: assertion errors, the [`Check`] seam, descriptors
//! - [`checker`]: the per-sequence group state machine
//! - [`subject`]: fluent single-trace subjects built on the checker
//! - [`tagging`]: pluggable transition rules producing tags
//! - [`engine`]: per-tag orchestration, crash isolation, report assembly
//! - [`catalog`]: declarative (serde) checks and plan configuration
//! - [`service`]: tagging + assertions behind one call
//!
//! The core never logs to a global channel. Callers that want diagnostics
//! pass a [`LogSink`].

pub mod assertion;
pub mod catalog;
pub mod checker;
pub mod engine;
pub mod error;
pub mod frame;
pub mod log;
pub mod report;
pub mod service;
pub mod subject;
pub mod tag;
pub mod tagging;

pub use assertion::{ensure, Assertion, AssertionDescriptor, AssertionError, Check};
pub use catalog::{AssertionConfig, CheckSpec, ConfiguredAssertion, PlanConfig};
pub use checker::{
    AssertionFailure, AssertionsChecker, CheckOutcome, CheckPolicy, CheckerBuilder, CheckerRun,
    CheckerState, GroupOutcome, SnapshotFailure,
};
pub use engine::{AssertionEngine, AssertionPlan};
pub use error::AnalysisError;
pub use frame::{frames_between, merge_frames, Frame, FrameOrigin, FrameSubject, SnapshotKind};
pub use log::LogSink;
pub use report::{ErrorEntry, ErrorKind, ErrorReport, MetricMap, ReportSummary};
pub use service::{Analysis, FlickerService};
pub use subject::{LayersTraceSubject, SubjectFailure, TraceSubject, WindowManagerTraceSubject};
pub use tag::{Tag, TagTrace};
pub use tagging::{
    FocusChangeRule, LayerGeometryRule, LayerVisibilityRule, TagRule, TaggingEngine,
};
