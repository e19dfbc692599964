// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ordered assertion groups evaluated snapshot by snapshot.
//!
//! An [`AssertionsChecker`] holds a list of groups. Each group is a
//! conjunction; groups compose sequentially ("then"), so group `i + 1` is
//! first evaluated on the snapshot *after* group `i` first held.
//!
//! ```text
//! Scanning{0} ──all hold──▶ Scanning{1} ──all hold──▶ … ──▶ AllGroupsSatisfied
//!     │ fail (skip mode, group 0): discard, stay
//!     │ fail: record, stay (or FailedFast under fail_fast)
//!     └ end of snapshots while scanning ──▶ Exhausted{group}
//! ```
//!
//! The checker itself is immutable and reusable; every [`AssertionsChecker::check`]
//! call owns a fresh [`CheckerRun`] holding the mutable scan state.

use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use flicker_trace::{Timestamp, TraceEntry};

use crate::assertion::{AssertionError, Check};

/// Policy knobs for one checker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckPolicy {
    /// Tolerate leading snapshots that fail the first group.
    pub skip_until_first_pass: bool,
    /// Stop at the first recorded failure.
    pub fail_fast: bool,
}

/// Where a scan currently is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerState {
    /// Evaluating the group at this index.
    Scanning {
        /// Active group index.
        group: usize,
    },
    /// Every group held in order. `at` is the snapshot where the last group
    /// held, or `None` when there were no groups and no snapshots.
    AllGroupsSatisfied {
        /// Timestamp of the completing snapshot.
        at: Option<Timestamp>,
    },
    /// Snapshots ran out while `group` was still unsatisfied.
    Exhausted {
        /// Stalled group index.
        group: usize,
    },
    /// `group` failed and the policy demanded an immediate stop.
    FailedFast {
        /// Failing group index.
        group: usize,
    },
}

impl CheckerState {
    /// Returns `true` once the scan cannot change any further.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scanning { .. })
    }
}

/// One assertion that did not hold at one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// Assertion name.
    pub assertion: String,
    /// Snapshot timestamp.
    pub timestamp: Timestamp,
    /// Failure reason or crash message.
    pub reason: String,
}

/// Every failing assertion of one group at one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFailure {
    /// Position of the snapshot in the checked sequence.
    pub index: usize,
    /// Snapshot timestamp.
    pub timestamp: Timestamp,
    /// Failing assertions, in group order.
    pub failures: Vec<AssertionFailure>,
}

/// Per-group result of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    /// Assertion names in group order.
    pub assertions: Vec<String>,
    /// Timestamp of the snapshot where the group first held.
    pub satisfied_at: Option<Timestamp>,
    /// Recorded (non-skipped) failures, oldest first.
    pub failures: Vec<SnapshotFailure>,
}

impl GroupOutcome {
    /// Returns `true` if the group held at some snapshot.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.satisfied_at.is_some()
    }
}

/// Result of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Terminal state.
    pub state: CheckerState,
    /// One entry per configured group.
    pub groups: Vec<GroupOutcome>,
    /// Assertions that crashed, each reported once at its first crash.
    pub crashes: Vec<AssertionFailure>,
    /// First group-0 failure discarded by skip mode.
    pub first_skipped: Option<SnapshotFailure>,
    /// Timestamp of the last evaluated snapshot.
    pub last_timestamp: Option<Timestamp>,
}

impl CheckOutcome {
    /// Returns `true` if every group was satisfied.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.state, CheckerState::AllGroupsSatisfied { .. })
    }

    /// Number of recorded snapshot failures across all groups.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.groups.iter().map(|g| g.failures.len()).sum()
    }

    /// Returns `true` if the named assertion crashed.
    #[must_use]
    pub fn crashed(&self, name: &str) -> bool {
        self.crashes.iter().any(|c| c.assertion == name)
    }

    /// Returns `true` if `name` belongs to a satisfied group and never crashed.
    #[must_use]
    pub fn passed(&self, name: &str) -> bool {
        !self.crashed(name)
            && self
                .groups
                .iter()
                .any(|g| g.is_satisfied() && g.assertions.iter().any(|a| a == name))
    }

    /// The failures that explain an unsuccessful scan.
    ///
    /// - `FailedFast`: the failures of the snapshot that stopped the scan.
    /// - `Exhausted` in group 0 while skip mode never saw a pass: the first
    ///   skipped failure.
    /// - `Exhausted` otherwise: the last recorded failures of the stalled
    ///   group. A stalled group that never got a snapshot reports each of its
    ///   assertions as not evaluated at the last timestamp.
    ///
    /// Successful scans surface nothing.
    #[must_use]
    pub fn surfaced_failures(&self) -> Vec<AssertionFailure> {
        let group = match self.state {
            CheckerState::AllGroupsSatisfied { .. } | CheckerState::Scanning { .. } => {
                return Vec::new()
            }
            CheckerState::Exhausted { group } | CheckerState::FailedFast { group } => group,
        };
        let Some(outcome) = self.groups.get(group) else {
            return Vec::new();
        };
        if let Some(last) = outcome.failures.last() {
            return last.failures.clone();
        }
        if group == 0 {
            if let Some(skipped) = &self.first_skipped {
                return skipped.failures.clone();
            }
        }
        let timestamp = self.last_timestamp.unwrap_or(Timestamp::MIN);
        outcome
            .assertions
            .iter()
            .map(|name| AssertionFailure {
                assertion: name.clone(),
                timestamp,
                reason: format!("trace ended before group {group} could be evaluated"),
            })
            .collect()
    }
}

/// Immutable list of assertion groups plus policy.
#[derive(Debug, Clone)]
pub struct AssertionsChecker<C> {
    groups: Vec<Vec<C>>,
    policy: CheckPolicy,
}

impl<C> Default for AssertionsChecker<C> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            policy: CheckPolicy::default(),
        }
    }
}

impl<C> AssertionsChecker<C> {
    /// Starts a consuming builder.
    #[must_use]
    pub fn builder() -> CheckerBuilder<C> {
        CheckerBuilder::default()
    }

    /// Wraps already-formed groups. Empty groups are kept and hold vacuously.
    #[must_use]
    pub fn from_groups(groups: Vec<Vec<C>>, policy: CheckPolicy) -> Self {
        Self { groups, policy }
    }

    /// Configured groups.
    #[must_use]
    pub fn groups(&self) -> &[Vec<C>] {
        &self.groups
    }

    /// Configured policy.
    #[must_use]
    pub fn policy(&self) -> CheckPolicy {
        self.policy
    }

    /// Returns `true` when no group is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every assertion, group by group.
    pub fn assertions(&self) -> impl Iterator<Item = &C> {
        self.groups.iter().flatten()
    }

    /// Starts a stepwise scan over subjects of type `S`.
    #[must_use]
    pub fn start<S>(&self) -> CheckerRun<'_, C, S>
    where
        S: TraceEntry,
        C: Check<S>,
    {
        CheckerRun::new(self)
    }

    /// Scans `subjects` in order and returns the outcome.
    pub fn check<S>(&self, subjects: &[S]) -> CheckOutcome
    where
        S: TraceEntry,
        C: Check<S>,
    {
        let mut run = self.start();
        for subject in subjects {
            if run.step(subject).is_terminal() {
                break;
            }
        }
        run.finish()
    }
}

/// Consuming builder for [`AssertionsChecker`].
///
/// `check` appends to the current group, `and` is a readability no-op, and
/// `then` closes the current group so later checks start a new one.
#[derive(Debug, Clone)]
pub struct CheckerBuilder<C> {
    groups: Vec<Vec<C>>,
    open: bool,
    policy: CheckPolicy,
}

impl<C> Default for CheckerBuilder<C> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            open: false,
            policy: CheckPolicy::default(),
        }
    }
}

impl<C> CheckerBuilder<C> {
    /// Adds an assertion to the current group.
    #[must_use]
    pub fn check(mut self, assertion: C) -> Self {
        match self.groups.last_mut() {
            Some(group) if self.open => group.push(assertion),
            _ => {
                self.groups.push(vec![assertion]);
                self.open = true;
            }
        }
        self
    }

    /// Conjunction marker; the next check joins the current group.
    #[must_use]
    pub fn and(self) -> Self {
        self
    }

    /// Sequencing marker; the next check starts a new group.
    #[must_use]
    pub fn then(mut self) -> Self {
        self.open = false;
        self
    }

    /// Enables skip-until-first-pass for group 0.
    #[must_use]
    pub fn skip_until_first_pass(mut self) -> Self {
        self.policy.skip_until_first_pass = true;
        self
    }

    /// Enables fail-fast.
    #[must_use]
    pub fn fail_fast(mut self) -> Self {
        self.policy.fail_fast = true;
        self
    }

    /// Number of groups formed so far.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> AssertionsChecker<C> {
        AssertionsChecker {
            groups: self.groups,
            policy: self.policy,
        }
    }
}

/// Mutable scan state owned by exactly one run.
#[derive(Debug)]
pub struct CheckerRun<'c, C, S> {
    checker: &'c AssertionsChecker<C>,
    state: CheckerState,
    groups: Vec<GroupOutcome>,
    quarantined: Vec<Vec<bool>>,
    crashes: Vec<AssertionFailure>,
    first_skipped: Option<SnapshotFailure>,
    last_timestamp: Option<Timestamp>,
    index: usize,
    subject: PhantomData<fn(&S)>,
}

impl<'c, C, S> CheckerRun<'c, C, S>
where
    S: TraceEntry,
    C: Check<S>,
{
    fn new(checker: &'c AssertionsChecker<C>) -> Self {
        Self {
            checker,
            state: CheckerState::Scanning { group: 0 },
            groups: checker
                .groups
                .iter()
                .map(|g| GroupOutcome {
                    assertions: g.iter().map(|a| a.name().to_owned()).collect(),
                    satisfied_at: None,
                    failures: Vec::new(),
                })
                .collect(),
            quarantined: checker.groups.iter().map(|g| vec![false; g.len()]).collect(),
            crashes: Vec::new(),
            first_skipped: None,
            last_timestamp: None,
            index: 0,
            subject: PhantomData,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CheckerState {
        self.state
    }

    /// Feeds the next snapshot. Terminal runs ignore further snapshots.
    pub fn step(&mut self, subject: &S) -> CheckerState {
        let CheckerState::Scanning { group } = self.state else {
            return self.state;
        };
        let checker = self.checker;
        let timestamp = subject.timestamp();
        let index = self.index;
        self.index += 1;
        self.last_timestamp = Some(timestamp);

        let Some(assertions) = checker.groups.get(group) else {
            self.state = CheckerState::AllGroupsSatisfied {
                at: Some(timestamp),
            };
            return self.state;
        };

        let mut failures = Vec::new();
        for (slot, assertion) in assertions.iter().enumerate() {
            if self.quarantined[group][slot] {
                continue;
            }
            match evaluate_guarded(assertion, subject) {
                Ok(()) => {}
                Err(AssertionError::Failed { reason }) => failures.push(AssertionFailure {
                    assertion: assertion.name().to_owned(),
                    timestamp,
                    reason,
                }),
                Err(AssertionError::Crashed { message }) => {
                    self.quarantined[group][slot] = true;
                    self.crashes.push(AssertionFailure {
                        assertion: assertion.name().to_owned(),
                        timestamp,
                        reason: message,
                    });
                }
            }
        }

        let policy = checker.policy;
        if failures.is_empty() {
            self.groups[group].satisfied_at = Some(timestamp);
            self.state = if group + 1 == checker.groups.len() {
                CheckerState::AllGroupsSatisfied {
                    at: Some(timestamp),
                }
            } else {
                CheckerState::Scanning { group: group + 1 }
            };
        } else if group == 0 && policy.skip_until_first_pass {
            // Group 0 has never held here: holding once moves the scan on.
            if self.first_skipped.is_none() {
                self.first_skipped = Some(SnapshotFailure {
                    index,
                    timestamp,
                    failures,
                });
            }
        } else {
            self.groups[group].failures.push(SnapshotFailure {
                index,
                timestamp,
                failures,
            });
            if policy.fail_fast {
                self.state = CheckerState::FailedFast { group };
            }
        }
        self.state
    }

    /// Ends the scan, turning an unfinished scan into [`CheckerState::Exhausted`].
    #[must_use]
    pub fn finish(self) -> CheckOutcome {
        let state = match self.state {
            CheckerState::Scanning { group } if group >= self.checker.groups.len() => {
                CheckerState::AllGroupsSatisfied { at: None }
            }
            CheckerState::Scanning { group } => CheckerState::Exhausted { group },
            terminal => terminal,
        };
        CheckOutcome {
            state,
            groups: self.groups,
            crashes: self.crashes,
            first_skipped: self.first_skipped,
            last_timestamp: self.last_timestamp,
        }
    }
}

/// Evaluates one assertion, turning a panic into [`AssertionError::Crashed`].
fn evaluate_guarded<S, C: Check<S>>(assertion: &C, subject: &S) -> Result<(), AssertionError> {
    catch_unwind(AssertUnwindSafe(|| assertion.evaluate(subject)))
        .unwrap_or_else(|payload| Err(AssertionError::crashed(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::assertion::{ensure, Assertion};

    #[derive(Debug, Clone, Copy)]
    struct Snap(i64);

    impl TraceEntry for Snap {
        fn timestamp(&self) -> Timestamp {
            Timestamp(self.0)
        }
    }

    fn at_least(name: &str, min: i64) -> Assertion<Snap> {
        Assertion::new(name, move |s: &Snap| {
            ensure(s.0 >= min, || format!("{} < {min}", s.0))
        })
    }

    fn snaps(n: i64) -> Vec<Snap> {
        (0..n).map(Snap).collect()
    }

    #[test]
    fn builder_groups_follow_then() {
        let b = AssertionsChecker::builder()
            .check(at_least("a", 0))
            .and()
            .check(at_least("b", 0))
            .then()
            .check(at_least("c", 0));
        assert_eq!(b.group_count(), 2);
        let checker = b.build();
        assert_eq!(checker.groups()[0].len(), 2);
        assert_eq!(checker.groups()[1].len(), 1);
    }

    #[test]
    fn dangling_then_does_not_create_empty_group() {
        let checker = AssertionsChecker::builder()
            .check(at_least("a", 0))
            .then()
            .build();
        assert_eq!(checker.groups().len(), 1);
    }

    #[test]
    fn empty_checker_is_satisfied_at_first_snapshot() {
        let checker = AssertionsChecker::<Assertion<Snap>>::default();
        let outcome = checker.check(&snaps(3));
        assert_eq!(
            outcome.state,
            CheckerState::AllGroupsSatisfied {
                at: Some(Timestamp(0))
            }
        );
        let none = checker.check::<Snap>(&[]);
        assert_eq!(none.state, CheckerState::AllGroupsSatisfied { at: None });
    }

    #[test]
    fn next_group_starts_on_following_snapshot() {
        let checker = AssertionsChecker::builder()
            .check(at_least("g0", 2))
            .then()
            .check(at_least("g1", 0))
            .build();
        let outcome = checker.check(&snaps(5));
        assert_eq!(outcome.groups[0].satisfied_at, Some(Timestamp(2)));
        assert_eq!(outcome.groups[1].satisfied_at, Some(Timestamp(3)));
        assert!(outcome.is_success());
        assert_eq!(outcome.failure_count(), 2);
    }

    #[test]
    fn exhausted_surfaces_last_failures_of_stalled_group() {
        let checker = AssertionsChecker::builder()
            .check(at_least("g0", 0))
            .then()
            .check(at_least("never", 100))
            .build();
        let outcome = checker.check(&snaps(4));
        assert_eq!(outcome.state, CheckerState::Exhausted { group: 1 });
        let surfaced = outcome.surfaced_failures();
        assert_eq!(surfaced.len(), 1);
        assert_eq!(surfaced[0].assertion, "never");
        assert_eq!(surfaced[0].timestamp, Timestamp(3));
    }

    #[test]
    fn skip_mode_surfaces_first_skipped_failure() {
        let checker = AssertionsChecker::builder()
            .check(at_least("never", 100))
            .skip_until_first_pass()
            .build();
        let outcome = checker.check(&snaps(4));
        assert_eq!(outcome.state, CheckerState::Exhausted { group: 0 });
        assert_eq!(outcome.failure_count(), 0);
        let surfaced = outcome.surfaced_failures();
        assert_eq!(surfaced[0].timestamp, Timestamp(0));
        assert_eq!(surfaced[0].reason, "0 < 100");
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let checker = AssertionsChecker::builder()
            .check(at_least("late", 2))
            .fail_fast()
            .build();
        let outcome = checker.check(&snaps(5));
        assert_eq!(outcome.state, CheckerState::FailedFast { group: 0 });
        assert_eq!(outcome.last_timestamp, Some(Timestamp(0)));
        assert_eq!(outcome.surfaced_failures()[0].assertion, "late");
    }

    #[test]
    fn panicking_assertion_is_quarantined() {
        let boom = Assertion::new("boom", |_: &Snap| -> Result<(), AssertionError> {
            panic!("kaboom")
        });
        let checker = AssertionsChecker::builder()
            .check(boom)
            .and()
            .check(at_least("ok", 1))
            .build();
        let outcome = checker.check(&snaps(3));
        assert!(outcome.is_success());
        assert_eq!(outcome.crashes.len(), 1);
        assert_eq!(outcome.crashes[0].reason, "kaboom");
        assert!(outcome.crashed("boom"));
        assert!(!outcome.passed("boom"));
        assert!(outcome.passed("ok"));
    }

    #[test]
    fn stalled_group_without_snapshots_reports_not_evaluated() {
        let checker = AssertionsChecker::builder()
            .check(at_least("g0", 1))
            .then()
            .check(at_least("g1", 0))
            .build();
        let outcome = checker.check(&snaps(2));
        assert_eq!(outcome.state, CheckerState::Exhausted { group: 1 });
        let surfaced = outcome.surfaced_failures();
        assert_eq!(surfaced[0].assertion, "g1");
        assert_eq!(surfaced[0].timestamp, Timestamp(1));
        assert!(surfaced[0].reason.contains("trace ended"));
    }
}
