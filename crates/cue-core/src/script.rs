// SPDX-License-Identifier: Apache-2.0
//! Coroutine-shaped protocol bodies, without coroutines.
//!
//! A protocol body is a plain reentrant function. Each invocation
//! advances by exactly one step and returns; the only state that
//! survives between invocations is an integer step index owned by the
//! dispatcher. Resumption is simulated with two counters: the
//! persistent step index, and a per-call compare counter that is tested
//! against it at every yield site in source order. The site whose
//! number matches fires; every other site falls through.
//!
//! The same trick, minus the production machinery, is available as
//! [`StepFunction`] for generic incremental work such as orchestrating
//! several protocols in sequence.

use tracing::{debug, warn};

use crate::envelope::EventCheck;
use crate::production::Production;
use crate::rule::{PerformAction, Rule, UntilCondition};
use crate::store::RuleStore;

/// A protocol body: advances one production per call.
///
/// Returning `false` aborts the protocol; the dispatcher clears it.
pub type ProtocolFn<E, C, const CAP: usize> =
    for<'a, 'b> fn(&'a mut Script<'b, E, C, CAP>) -> bool;

/// An ordered sequence of productions expressed as a reentrant
/// function, plus a debug name. At most one protocol is current on a
/// dispatcher at any time.
pub struct Protocol<E, C, const CAP: usize = 20> {
    body: ProtocolFn<E, C, CAP>,
    name: &'static str,
}

impl<E, C, const CAP: usize> Clone for Protocol<E, C, CAP> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, C, const CAP: usize> Copy for Protocol<E, C, CAP> {}

impl<E, C, const CAP: usize> core::fmt::Debug for Protocol<E, C, CAP> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Protocol").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<E, C, const CAP: usize> Protocol<E, C, CAP> {
    /// Wraps a body function under a debug name.
    #[must_use]
    pub const fn new(name: &'static str, body: ProtocolFn<E, C, CAP>) -> Self {
        Self { body, name }
    }

    /// The protocol's debug name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn body(&self) -> ProtocolFn<E, C, CAP> {
        self.body
    }
}

/// The reentrancy harness handed to a protocol body.
///
/// Only the dispatcher constructs one, and it does so exactly once per
/// completed production, so a body cannot be stepped without an
/// intervening event-driven completion, and the step index can never
/// drift from repeated calls.
pub struct Script<'a, E, C, const CAP: usize = 20> {
    index: &'a mut u16,
    compare: u16,
    fired: bool,
    finished: bool,
    failed: bool,
    rules: &'a mut RuleStore<E, C, CAP>,
    production: &'a mut Production<E, C>,
    ctx: &'a mut C,
    now: u64,
}

impl<'a, E, C, const CAP: usize> Script<'a, E, C, CAP> {
    pub(crate) fn new(
        index: &'a mut u16,
        rules: &'a mut RuleStore<E, C, CAP>,
        production: &'a mut Production<E, C>,
        ctx: &'a mut C,
        now: u64,
    ) -> Self {
        Self {
            index,
            compare: 0,
            fired: false,
            finished: false,
            failed: false,
            rules,
            production,
            ctx,
            now,
        }
    }

    fn should_fire(&self) -> bool {
        !self.fired && !self.finished && !self.failed && *self.index == self.compare
    }

    fn cue(&mut self) -> Cue<'_, E, C, CAP> {
        Cue {
            rules: &mut *self.rules,
            production: &mut *self.production,
            ctx: &mut *self.ctx,
            now: self.now,
        }
    }

    /// Advance yield: if this is the current step, run `configure` to
    /// stage the next production, then move on to the following step.
    pub fn step(&mut self, configure: impl FnOnce(&mut Cue<'_, E, C, CAP>)) {
        if self.should_fire() {
            configure(&mut self.cue());
            *self.index += 1;
            self.fired = true;
        }
        self.compare += 1;
    }

    /// Conditional-repeat yield: like [`step`](Self::step), but after
    /// `configure` runs, `repeat_if` is consulted against the context;
    /// while it returns `true` the same step runs again on the next
    /// completion instead of advancing.
    pub fn step_while(
        &mut self,
        configure: impl FnOnce(&mut Cue<'_, E, C, CAP>),
        repeat_if: impl FnOnce(&C) -> bool,
    ) {
        if self.should_fire() {
            configure(&mut self.cue());
            if repeat_if(self.ctx) {
                debug!("repeating current step");
            } else {
                *self.index += 1;
            }
            self.fired = true;
        }
        self.compare += 1;
    }

    /// Terminal step: runs `epilogue`, resets the step index, and
    /// marks the protocol finished so the dispatcher clears it.
    pub fn finish(&mut self, epilogue: impl FnOnce(&mut C)) {
        if self.should_fire() {
            epilogue(self.ctx);
            *self.index = 0;
            self.finished = true;
            self.fired = true;
        }
        self.compare += 1;
    }

    /// Marks the protocol failed. Remaining yield sites are skipped
    /// and the body's return value becomes `false` via
    /// [`outcome`](Self::outcome).
    pub fn abort(&mut self) {
        self.failed = true;
    }

    /// The protocol-success flag; return this from the body.
    #[must_use]
    pub fn outcome(&self) -> bool {
        !self.failed
    }

    /// Whether any normal/exclusive rule fired during the production
    /// that just completed.
    #[must_use]
    pub fn met_expectations(&self) -> bool {
        self.production.met_expectations()
    }

    /// Read access to the protocol context.
    #[must_use]
    pub fn context(&self) -> &C {
        self.ctx
    }

    /// Write access to the protocol context.
    pub fn context_mut(&mut self) -> &mut C {
        self.ctx
    }

    pub(crate) fn finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn fired(&self) -> bool {
        self.fired
    }
}

/// The production-configuration surface available inside a step body.
///
/// Everything staged here takes effect on the next event dispatch: the
/// perform runs first (once), the expectations react to events, and
/// the until conditions decide when the production is over.
pub struct Cue<'a, E, C, const CAP: usize = 20> {
    rules: &'a mut RuleStore<E, C, CAP>,
    production: &'a mut Production<E, C>,
    ctx: &'a mut C,
    now: u64,
}

impl<'a, E, C, const CAP: usize> Cue<'a, E, C, CAP> {
    pub(crate) fn new(
        rules: &'a mut RuleStore<E, C, CAP>,
        production: &'a mut Production<E, C>,
        ctx: &'a mut C,
        now: u64,
    ) -> Self {
        Self { rules, production, ctx, now }
    }

    /// Stages the perform action that starts this production. It runs
    /// exactly once, on the first event dispatched to the production,
    /// before any rule is evaluated; returning `false` aborts the
    /// protocol.
    pub fn perform(&mut self, action: PerformAction<C>, name: &'static str) {
        self.production.set_perform(action, name);
    }

    /// Adds a normal expectation: every matching normal rule fires.
    ///
    /// A full set logs a warning and drops the rule; the production
    /// proceeds without it.
    pub fn expect(&mut self, rule: Rule<E, C>) {
        if self.rules.normal.push(rule).is_err() {
            warn!(set = "normal", "rule set full; expectation dropped");
        }
    }

    /// Adds an exclusive expectation: at most the first matching
    /// exclusive rule fires per event.
    pub fn expect_exclusive(&mut self, rule: Rule<E, C>) {
        if self.rules.exclusive.push(rule).is_err() {
            warn!(set = "exclusive", "rule set full; expectation dropped");
        }
    }

    /// Adds a global expectation: consulted only when no normal or
    /// exclusive rule matched, and it persists across productions.
    pub fn expect_global(&mut self, rule: Rule<E, C>) {
        if self.rules.global.push(rule).is_err() {
            warn!(set = "global", "rule set full; expectation dropped");
        }
    }

    /// Runs the production until `condition` holds for a dispatched
    /// event.
    pub fn until(&mut self, condition: UntilCondition<E>) {
        self.production.set_until(condition);
    }

    /// Runs the production until an event matching `check` arrives.
    pub fn until_event(&mut self, check: EventCheck) {
        self.production.set_until_event(check);
    }

    /// Runs the production until `after_ms` milliseconds have elapsed,
    /// measured from now and evaluated cooperatively at each dispatch.
    pub fn timeout_ms(&mut self, after_ms: u64) {
        self.production.set_timeout(after_ms, self.now);
    }

    /// Whether any normal/exclusive rule fired during the production
    /// that just completed.
    #[must_use]
    pub fn met_expectations(&self) -> bool {
        self.production.met_expectations()
    }

    /// Read access to the protocol context.
    #[must_use]
    pub fn context(&self) -> &C {
        self.ctx
    }

    /// Write access to the protocol context.
    pub fn context_mut(&mut self) -> &mut C {
        self.ctx
    }
}

/// Body of a generic step function.
pub type StepFn<C> = for<'s> fn(&mut Steps<'s>, &mut C);

/// A generic reentrant function with a persistent step counter and no
/// rule/production coupling: call [`run`](Self::run) repeatedly and one
/// step executes per call.
///
/// Useful for orchestrating work that must happen a piece at a time,
/// for example starting one protocol, waiting for it to finish, then
/// starting the next.
pub struct StepFunction<C> {
    body: StepFn<C>,
    name: &'static str,
    index: u16,
}

impl<C> core::fmt::Debug for StepFunction<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StepFunction")
            .field("name", &self.name)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl<C> StepFunction<C> {
    /// Wraps a body function under a debug name.
    #[must_use]
    pub const fn new(name: &'static str, body: StepFn<C>) -> Self {
        Self { body, name, index: 0 }
    }

    /// Runs the current step (at most one fires per call).
    pub fn run(&mut self, ctx: &mut C) {
        let mut steps = Steps { index: &mut self.index, compare: 0, fired: false, halted: false };
        (self.body)(&mut steps, ctx);
    }

    /// Rewinds to the first step.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// The persistent step counter.
    #[must_use]
    pub const fn step_index(&self) -> u16 {
        self.index
    }

    /// The function's debug name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Yield-site surface handed to a [`StepFunction`] body.
pub struct Steps<'a> {
    index: &'a mut u16,
    compare: u16,
    fired: bool,
    halted: bool,
}

impl Steps<'_> {
    fn should_fire(&self) -> bool {
        !self.fired && !self.halted && *self.index == self.compare
    }

    /// Guard: when `skip` is true no step runs this call. Place it
    /// before the first step.
    pub fn skip_all_if(&mut self, skip: bool) {
        if skip {
            self.halted = true;
        }
    }

    /// A step. Runs `body` when it is the current step, then advances.
    /// Returning early from `body` still advances ("force next step
    /// this call").
    pub fn step(&mut self, body: impl FnOnce()) {
        if self.should_fire() {
            body();
            *self.index += 1;
            self.fired = true;
        }
        self.compare += 1;
    }

    /// A repeatable step: `body` returns `true` to run the same step
    /// again on the next call, `false` to advance.
    pub fn step_while(&mut self, body: impl FnOnce() -> bool) {
        if self.should_fire() {
            if !body() {
                *self.index += 1;
            }
            self.fired = true;
        }
        self.compare += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Trace {
        log: RefCell<Vec<&'static str>>,
        skip: bool,
        repeats_left: u32,
    }

    fn body(steps: &mut Steps<'_>, ctx: &mut Trace) {
        steps.skip_all_if(ctx.skip);
        steps.step(|| ctx.log.borrow_mut().push("first"));
        steps.step_while(|| {
            ctx.log.borrow_mut().push("second");
            if ctx.repeats_left > 0 {
                ctx.repeats_left -= 1;
                true
            } else {
                false
            }
        });
        steps.step(|| ctx.log.borrow_mut().push("last"));
    }

    #[test]
    fn one_step_per_call_in_source_order() {
        let mut sf = StepFunction::new("trace", body);
        let mut ctx = Trace::default();
        for _ in 0..3 {
            sf.run(&mut ctx);
        }
        assert_eq!(*ctx.log.borrow(), vec!["first", "second", "last"]);
        assert_eq!(sf.step_index(), 3, "ran past the last step");
    }

    #[test]
    fn step_while_repeats_until_false() {
        let mut sf = StepFunction::new("trace", body);
        let mut ctx = Trace { repeats_left: 2, ..Trace::default() };
        for _ in 0..5 {
            sf.run(&mut ctx);
        }
        assert_eq!(*ctx.log.borrow(), vec!["first", "second", "second", "second", "last"]);
    }

    #[test]
    fn skip_guard_freezes_the_counter() {
        let mut sf = StepFunction::new("trace", body);
        let mut ctx = Trace { skip: true, ..Trace::default() };
        sf.run(&mut ctx);
        sf.run(&mut ctx);
        assert!(ctx.log.borrow().is_empty());
        assert_eq!(sf.step_index(), 0);

        ctx.skip = false;
        sf.run(&mut ctx);
        assert_eq!(*ctx.log.borrow(), vec!["first"]);
    }

    #[test]
    fn reset_rewinds_to_the_first_step() {
        let mut sf = StepFunction::new("trace", body);
        let mut ctx = Trace::default();
        sf.run(&mut ctx);
        sf.reset();
        sf.run(&mut ctx);
        assert_eq!(*ctx.log.borrow(), vec!["first", "first"]);
    }
}
