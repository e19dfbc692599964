// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Caller-supplied diagnostic sink.

use std::sync::Arc;

/// Receives verbose diagnostic lines from the tagging and assertion engines.
///
/// The core never writes to a process-wide logger; binaries adapt this onto
/// whatever logging stack they run.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Formats and forwards a line only when a sink is installed.
pub(crate) fn emit(sink: Option<&LogSink>, message: impl FnOnce() -> String) {
    if let Some(sink) = sink {
        sink(&message());
    }
}
