// SPDX-License-Identifier: Apache-2.0
//! The production engine.
//!
//! A production is one unit of protocol work: an optional perform
//! action that starts something, a set of expectation rules to react to
//! the resulting events, and a termination condition ("until"). The
//! engine here runs one production at a time against the event stream:
//! consume the pending perform on the first event, fire rules in
//! precedence order, then decide whether the production is finished.
//!
//! Firing precedence per event: exclusive rules (first match only),
//! then normal rules (every match, insertion order), then, only if
//! neither fired, global rules (first match only). Global matches do
//! not count towards `met_expectations`; they exist to trap errors and
//! unexpected events.

use tracing::{debug, trace, warn};

use crate::envelope::{Envelope, EventCheck};
use crate::rule::{PerformAction, UntilCondition};
use crate::store::RuleStore;

/// Outcome of dispatching one event, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The current production finished (or a failed perform aborted the
    /// protocol). Transient rules and until conditions are cleared.
    Done,
    /// A rule fired but the production keeps running.
    Advanced,
    /// Nothing fired; the production keeps running.
    NoMatch,
}

/// Internal dispatch outcome; distinguishes the perform-failure abort
/// from an ordinary completion so the dispatcher can clear the current
/// protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Done { perform_failed: bool },
    Advanced,
    NoMatch,
}

/// Pending perform action plus its debug name.
struct Perform<C> {
    run: PerformAction<C>,
    name: &'static str,
}

impl<C> Clone for Perform<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Perform<C> {}

/// Cooperative timeout: configured duration and the instant the
/// production was staged. Evaluated only when an event is dispatched,
/// so a production may overrun by up to the inter-event gap.
#[derive(Debug, Clone, Copy)]
struct Timeout {
    after_ms: u64,
    started_at: u64,
}

/// Transient state of the in-flight production.
pub struct Production<E, C> {
    perform: Option<Perform<C>>,
    until: Option<UntilCondition<E>>,
    until_check: Option<EventCheck>,
    timeout: Option<Timeout>,
    /// Whether any normal/exclusive rule has fired during the current
    /// production. Globals never set this.
    rule_matched: bool,
    /// Set when a production completes; the next dispatched event
    /// belongs to a new production and resets `rule_matched` first.
    between_productions: bool,
}

impl<E, C> Default for Production<E, C> {
    fn default() -> Self {
        Self {
            perform: None,
            until: None,
            until_check: None,
            timeout: None,
            rule_matched: false,
            between_productions: false,
        }
    }
}

impl<E, C> core::fmt::Debug for Production<E, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Production")
            .field("perform", &self.perform.as_ref().map(|p| p.name))
            .field("has_until", &self.until.is_some())
            .field("until_check", &self.until_check)
            .field("rule_matched", &self.rule_matched)
            .finish_non_exhaustive()
    }
}

impl<E, C> Production<E, C> {
    /// Stages the perform action for the next dispatch. At most one
    /// perform is pending per production; staging another replaces it.
    pub(crate) fn set_perform(&mut self, action: PerformAction<C>, name: &'static str) {
        if let Some(old) = &self.perform {
            debug!(replaced = old.name, with = name, "perform replaced before it ran");
        }
        self.perform = Some(Perform { run: action, name });
    }

    pub(crate) fn set_until(&mut self, condition: UntilCondition<E>) {
        self.until = Some(condition);
    }

    pub(crate) fn set_until_event(&mut self, check: EventCheck) {
        self.until_check = Some(check);
    }

    pub(crate) fn set_timeout(&mut self, after_ms: u64, now: u64) {
        self.timeout = Some(Timeout { after_ms, started_at: now });
    }

    /// Whether any normal/exclusive rule has fired during the current
    /// production.
    pub(crate) const fn met_expectations(&self) -> bool {
        self.rule_matched
    }

    pub(crate) fn reset_rule_matched(&mut self) {
        self.rule_matched = false;
    }

    /// Drops every termination source and any not-yet-run perform.
    /// Used when the current protocol is cleared.
    pub(crate) fn clear_transient(&mut self) {
        self.perform = None;
        self.until = None;
        self.until_check = None;
        self.timeout = None;
    }

    fn no_until_configured(&self) -> bool {
        self.until.is_none() && self.until_check.is_none() && self.timeout.is_none()
    }
}

impl<E: Envelope, C> Production<E, C> {
    /// Runs the current production against one event.
    ///
    /// Non-event packets short-circuit to `NoMatch`: no rules are
    /// evaluated, no until condition is checked, and a pending perform
    /// stays pending for the next real event.
    pub(crate) fn dispatch<const CAP: usize>(
        &mut self,
        rules: &mut RuleStore<E, C, CAP>,
        event: &E,
        ctx: &mut C,
        now: u64,
    ) -> Outcome {
        if !event.is_event() {
            trace!("non-event packet received; no rules evaluated");
            return Outcome::NoMatch;
        }

        if self.between_productions {
            self.rule_matched = false;
            self.between_productions = false;
        }

        // The one-shot perform: consumed whether it succeeds or fails,
        // strictly before any rule evaluation.
        if let Some(perform) = self.perform.take() {
            trace!(action = perform.name, "running perform");
            if !(perform.run)(ctx) {
                warn!(action = perform.name, "perform failed");
                self.finish(rules);
                return Outcome::Done { perform_failed: true };
            }
        }

        let mut matched_expectation = false;
        for rule in rules.exclusive.iter() {
            if rule.fire(event, ctx) {
                matched_expectation = true;
                break;
            }
        }
        // Every matching normal rule fires, even after an exclusive hit.
        for rule in rules.normal.iter() {
            if rule.fire(event, ctx) {
                matched_expectation = true;
            }
        }
        if matched_expectation {
            self.rule_matched = true;
        }

        let mut fired_global = false;
        if !matched_expectation {
            for rule in rules.global.iter() {
                if rule.fire(event, ctx) {
                    fired_global = true;
                    break;
                }
            }
        }

        if self.is_finished(event, now) {
            self.finish(rules);
            return Outcome::Done { perform_failed: false };
        }

        if matched_expectation || fired_global {
            Outcome::Advanced
        } else {
            Outcome::NoMatch
        }
    }

    /// A production with no until source at all is single-shot; one
    /// dispatch completes it regardless of rule outcome. Otherwise any
    /// configured source that ends (predicate, event match, or elapsed
    /// timeout) finishes it.
    fn is_finished(&self, event: &E, now: u64) -> bool {
        if self.no_until_configured() {
            return true;
        }
        if self.until.is_some_and(|until| until(event)) {
            return true;
        }
        if self.until_check.is_some_and(|check| check.matches(event)) {
            return true;
        }
        if let Some(timeout) = self.timeout {
            if now.saturating_sub(timeout.started_at) >= timeout.after_ms {
                debug!(after_ms = timeout.after_ms, "production timed out");
                return true;
            }
        }
        false
    }

    /// End-of-production reset: transient rules, until conditions, and
    /// the timeout go away; globals and `rule_matched` survive (the
    /// protocol body still needs to read the latter).
    fn finish<const CAP: usize>(&mut self, rules: &mut RuleStore<E, C, CAP>) {
        rules.clear_transient();
        self.until = None;
        self.until_check = None;
        self.timeout = None;
        self.between_productions = true;
    }
}
