// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canned assertion descriptors for tests.
//!
//! Each helper returns an [`AssertionDescriptor`] whose verdict depends only
//! on the frame timestamp, so suites can script pass/fail patterns without
//! building realistic hierarchies.

use std::sync::{Arc, Mutex};

use flicker_core::{AssertionDescriptor, AssertionError};
use flicker_trace::Timestamp;

// --- Fixed verdicts ---

/// Always holds.
pub fn passing(name: &str, tags: &[&str]) -> AssertionDescriptor {
    AssertionDescriptor::new(name, tags.iter().copied(), |_| Ok(()))
}

/// Never holds; fails with `reason`.
pub fn failing(name: &str, tags: &[&str], reason: &str) -> AssertionDescriptor {
    let reason = reason.to_string();
    AssertionDescriptor::new(name, tags.iter().copied(), move |_| {
        Err(AssertionError::failed(reason.clone()))
    })
}

/// Reports a crash on every evaluation.
pub fn crashing(name: &str, tags: &[&str], message: &str) -> AssertionDescriptor {
    let message = message.to_string();
    AssertionDescriptor::new(name, tags.iter().copied(), move |_| {
        Err(AssertionError::crashed(message.clone()))
    })
}

/// Panics on every evaluation.
#[allow(clippy::panic)]
pub fn panicking(name: &str, tags: &[&str]) -> AssertionDescriptor {
    let label = name.to_string();
    AssertionDescriptor::new(name, tags.iter().copied(), move |_| {
        panic!("{label} blew up")
    })
}

// --- Timestamp-driven verdicts ---

/// Holds on frames at or after `from_ns`.
pub fn holds_from(name: &str, tags: &[&str], from_ns: i64) -> AssertionDescriptor {
    AssertionDescriptor::new(name, tags.iter().copied(), move |subject| {
        let at = subject.frame().timestamp;
        if at >= Timestamp(from_ns) {
            Ok(())
        } else {
            Err(AssertionError::failed(format!("{at} is before {}", Timestamp(from_ns))))
        }
    })
}

/// Timestamps seen by a [`recording`] descriptor, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct EvaluationLog {
    seen: Arc<Mutex<Vec<Timestamp>>>,
}

impl EvaluationLog {
    /// Every evaluated timestamp so far.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of evaluations so far.
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, at: Timestamp) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(at);
    }
}

/// Holds on frames at or after `from_ns` and logs every evaluated timestamp.
pub fn recording(name: &str, tags: &[&str], from_ns: i64) -> (AssertionDescriptor, EvaluationLog) {
    let log = EvaluationLog::default();
    let sink = log.clone();
    let descriptor = AssertionDescriptor::new(name, tags.iter().copied(), move |subject| {
        let at = subject.frame().timestamp;
        sink.push(at);
        if at >= Timestamp(from_ns) {
            Ok(())
        } else {
            Err(AssertionError::failed(format!("{at} is before {}", Timestamp(from_ns))))
        }
    });
    (descriptor, log)
}
