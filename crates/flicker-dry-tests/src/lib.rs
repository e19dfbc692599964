// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for flicker crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`traces`] - Layer and window snapshot builders, trace helpers
//! - [`descriptors`] - Canned assertion descriptors (pass, fail, crash, panic, record)
//! - [`scenarios`] - Ready-made trace pairs and plans used across suites

pub mod config;
pub mod descriptors;
pub mod scenarios;
pub mod traces;

pub use config::InMemoryConfigStore;
pub use descriptors::{
    crashing, failing, holds_from, panicking, passing, recording, EvaluationLog,
};
pub use scenarios::{
    status_bar_plan, status_bar_traces, WholeTraceRule, STATUS_BAR, STATUS_BAR_REGION,
};
pub use traces::{
    layers_trace, trace_json, wm_trace, LayerEntryBuilder, WindowStateBuilder, DISPLAY_BOUNDS,
};
