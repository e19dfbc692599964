// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Snapshot model for flicker trace analysis.
//!
//! A trace is an ordered, immutable sequence of snapshots captured from a
//! running graphical system. Two kinds exist:
//!
//! - [`WindowManagerTrace`]: window-hierarchy snapshots ([`WindowManagerState`]).
//! - [`LayersTrace`]: compositor layer snapshots ([`LayerTraceEntry`]).
//!
//! # Invariants
//!
//! - Entry timestamps are non-decreasing; [`Trace::new`] rejects anything else.
//! - A trace is never mutated after construction. Provenance
//!   ([`TraceSource`]) is attached by value and only used for diagnostics.

pub mod geometry;
pub mod io;
pub mod layers;
pub mod time;
pub mod trace;
pub mod window;

pub use geometry::Rect;
pub use io::{checksum_hex, decode_trace, read_trace};
pub use layers::{Display, Layer, LayerTraceEntry, LayersTrace};
pub use time::Timestamp;
pub use trace::{Trace, TraceEntry, TraceError, TraceSource};
pub use window::{WindowManagerState, WindowManagerTrace, WindowState};
