// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tagging followed by assertions, behind one call.

use flicker_trace::{LayersTrace, WindowManagerTrace};
use serde::{Deserialize, Serialize};

use crate::catalog::AssertionConfig;
use crate::engine::{AssertionEngine, AssertionPlan};
use crate::error::AnalysisError;
use crate::log::LogSink;
use crate::report::{ErrorReport, MetricMap};
use crate::tag::TagTrace;
use crate::tagging::TaggingEngine;

/// Everything one analysis produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Tags found in the traces.
    pub tags: TagTrace,
    /// Problems found while asserting.
    pub report: ErrorReport,
    /// Per-assertion pass/fail.
    pub metrics: MetricMap,
}

/// Stateless orchestration of [`TaggingEngine`] and [`AssertionEngine`].
///
/// Configuration is validated when the service is built; each call rebuilds
/// every piece of scan state, so one service can analyze many trace pairs.
#[derive(Debug)]
pub struct FlickerService {
    tagging: TaggingEngine,
    assertions: AssertionEngine,
    workers: usize,
}

impl FlickerService {
    /// Service with the built-in tag rules.
    #[must_use]
    pub fn new(assertions: AssertionEngine) -> Self {
        Self {
            tagging: TaggingEngine::new(),
            assertions,
            workers: 1,
        }
    }

    /// Validates `plans` and builds a service.
    pub fn from_plans(plans: Vec<AssertionPlan>) -> Result<Self, AnalysisError> {
        AssertionEngine::new(plans).map(Self::new)
    }

    /// Builds a service from a declarative configuration.
    pub fn from_config(config: &AssertionConfig) -> Result<Self, AnalysisError> {
        config.to_engine().map(Self::new)
    }

    /// Replaces the tagging engine.
    #[must_use]
    pub fn with_tagging(mut self, tagging: TaggingEngine) -> Self {
        self.tagging = tagging;
        self
    }

    /// Routes diagnostics from both engines to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.tagging = self.tagging.with_sink(sink.clone());
        self.assertions = self.assertions.with_sink(sink);
        self
    }

    /// Evaluates tags on up to `workers` threads (1 keeps everything on the
    /// calling thread).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Tags the traces, then checks every tag.
    #[must_use]
    pub fn analyze(
        &self,
        wm: &WindowManagerTrace,
        layers: &LayersTrace,
    ) -> (ErrorReport, MetricMap) {
        let Analysis {
            report, metrics, ..
        } = self.run(wm, layers);
        (report, metrics)
    }

    /// Like [`FlickerService::analyze`], also returning the tag trace.
    #[must_use]
    pub fn run(&self, wm: &WindowManagerTrace, layers: &LayersTrace) -> Analysis {
        let tags = self.tagging.run(wm, layers);
        let (report, metrics) = if self.workers > 1 {
            self.assertions
                .analyze_parallel(wm, layers, &tags, self.workers)
        } else {
            self.assertions.analyze(wm, layers, &tags)
        };
        Analysis {
            tags,
            report,
            metrics,
        }
    }
}
