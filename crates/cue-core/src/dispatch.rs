// SPDX-License-Identifier: Apache-2.0
//! The dispatcher: single event entry point and owner of all engine
//! state.
//!
//! One [`Dispatcher`] value folds together what the framework needs to
//! run: the rule store, the in-flight production, the current protocol
//! (with its persistent step index), the user context lent to every
//! callback, and the clock. The host's event callback forwards each
//! packet to [`Dispatcher::on_event`]; everything else happens from
//! there, on the caller's thread. There is no parallelism and no
//! reentrancy: action callbacks must not call `on_event` recursively.

use tracing::{debug, trace, warn};

use crate::envelope::{Envelope, EventCheck};
use crate::production::{Disposition, Outcome, Production};
use crate::rule::{PerformAction, Rule, UntilCondition};
use crate::script::{Cue, Protocol, Script};
use crate::store::RuleStore;

/// Monotonic millisecond clock collaborator. Used only for cooperative
/// timeouts; wrap-around semantics are the host's.
pub type ClockFn = fn() -> u64;

/// The current protocol and its persistent step index.
struct Running<E, C, const CAP: usize> {
    protocol: Protocol<E, C, CAP>,
    step: u16,
}

/// Single-threaded cooperative dispatcher.
///
/// Generic over the host's event type `E`, the user context `C` handed
/// to every callback, and the per-set rule capacity `CAP`.
pub struct Dispatcher<E, C, const CAP: usize = 20> {
    rules: RuleStore<E, C, CAP>,
    production: Production<E, C>,
    current: Option<Running<E, C, CAP>>,
    ctx: C,
    clock: ClockFn,
}

impl<E, C, const CAP: usize> core::fmt::Debug for Dispatcher<E, C, CAP> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("rules", &self.rules)
            .field("production", &self.production)
            .field("current", &self.current.as_ref().map(|r| r.protocol.name()))
            .finish_non_exhaustive()
    }
}

impl<E, C, const CAP: usize> Dispatcher<E, C, CAP> {
    /// Creates a dispatcher owning `ctx`, reading time from `clock`.
    pub fn new(ctx: C, clock: ClockFn) -> Self {
        Self {
            rules: RuleStore::default(),
            production: Production::default(),
            current: None,
            ctx,
            clock,
        }
    }

    /// Whether a protocol is currently running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// The current protocol, if any.
    #[must_use]
    pub fn current_protocol(&self) -> Option<Protocol<E, C, CAP>> {
        self.current.as_ref().map(|r| r.protocol)
    }

    /// Clears the current protocol and all transient state: normal and
    /// exclusive rules, until conditions, the timeout, and any pending
    /// perform. Global rules persist.
    pub fn clear_current_protocol(&mut self) {
        self.rules.clear_transient();
        self.production.clear_transient();
        self.production.reset_rule_matched();
        self.current = None;
    }

    /// Whether any normal/exclusive rule has fired during the current
    /// production.
    #[must_use]
    pub fn met_expectations(&self) -> bool {
        self.production.met_expectations()
    }

    /// Read access to the user context.
    #[must_use]
    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// Write access to the user context.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// Clears the normal expectations and resets the
    /// expectations-met flag.
    pub fn clear_expectations(&mut self) {
        self.rules.normal.clear();
        self.production.reset_rule_matched();
    }

    /// Clears the exclusive expectations.
    pub fn clear_exclusive_expectations(&mut self) {
        self.rules.exclusive.clear();
    }

    /// Clears the global expectations.
    pub fn clear_global_expectations(&mut self) {
        self.rules.global.clear();
    }

    /// Clears all three rule sets (and the expectations-met flag).
    pub fn clear_all_expectations(&mut self) {
        self.clear_expectations();
        self.rules.exclusive.clear();
        self.rules.global.clear();
    }

    fn stage(&mut self) -> Cue<'_, E, C, CAP> {
        let now = (self.clock)();
        Cue::new(&mut self.rules, &mut self.production, &mut self.ctx, now)
    }

    /// Stages the perform action for the next production directly,
    /// without a protocol. See [`Cue::perform`].
    pub fn perform(&mut self, action: PerformAction<C>, name: &'static str) {
        self.stage().perform(action, name);
    }

    /// Adds a normal expectation directly. See [`Cue::expect`].
    pub fn expect(&mut self, rule: Rule<E, C>) {
        self.stage().expect(rule);
    }

    /// Adds an exclusive expectation directly. See
    /// [`Cue::expect_exclusive`].
    pub fn expect_exclusive(&mut self, rule: Rule<E, C>) {
        self.stage().expect_exclusive(rule);
    }

    /// Adds a global expectation directly. See [`Cue::expect_global`].
    pub fn expect_global(&mut self, rule: Rule<E, C>) {
        self.stage().expect_global(rule);
    }

    /// Configures an until predicate directly. See [`Cue::until`].
    pub fn until(&mut self, condition: UntilCondition<E>) {
        self.stage().until(condition);
    }

    /// Configures an until event match directly. See
    /// [`Cue::until_event`].
    pub fn until_event(&mut self, check: EventCheck) {
        self.stage().until_event(check);
    }

    /// Configures a cooperative timeout directly, measured from now.
    /// See [`Cue::timeout_ms`].
    pub fn timeout_ms(&mut self, after_ms: u64) {
        self.stage().timeout_ms(after_ms);
    }
}

impl<E: Envelope, C, const CAP: usize> Dispatcher<E, C, CAP> {
    /// The single event entry point; call it from the host's event
    /// callback with every incoming packet.
    ///
    /// Runs the production engine over the packet. When the production
    /// completes, the current protocol body (if any) is invoked to
    /// stage the next production; a body that aborts or reaches its
    /// terminal step clears the current protocol.
    pub fn on_event(&mut self, packet: &E) -> Disposition {
        let now = (self.clock)();
        match self.production.dispatch(&mut self.rules, packet, &mut self.ctx, now) {
            Outcome::Done { perform_failed: true } => {
                if let Some(running) = &self.current {
                    warn!(
                        protocol = running.protocol.name(),
                        "perform failed; aborting current protocol"
                    );
                }
                self.clear_current_protocol();
                Disposition::Done
            }
            Outcome::Done { perform_failed: false } => {
                trace!("production finished");
                if self.current.is_some() {
                    self.advance_current(now);
                } else {
                    debug!("production finished with no protocol to advance");
                }
                Disposition::Done
            }
            Outcome::Advanced => Disposition::Advanced,
            Outcome::NoMatch => Disposition::NoMatch,
        }
    }

    /// Installs `protocol` as current and immediately invokes its body
    /// once, so the first production (and its pending perform) is
    /// staged for the next incoming event. Any previously running
    /// protocol is cleared first.
    ///
    /// Returns whether the protocol is still running afterwards (a
    /// body may abort, or even finish, on its first step).
    pub fn set_current_protocol(&mut self, protocol: Protocol<E, C, CAP>) -> bool {
        if self.current.is_some() {
            warn!(starting = protocol.name(), "replacing a running protocol");
            self.clear_current_protocol();
        }
        debug!(protocol = protocol.name(), "starting protocol");
        self.current = Some(Running { protocol, step: 0 });
        let now = (self.clock)();
        self.advance_current(now);
        self.is_running()
    }

    /// Pulls packets from `next_event` and dispatches them until the
    /// current protocol finishes (or the source runs dry).
    ///
    /// This is the pull-loop rendition of a busy-wait: hosts whose
    /// event loop already suspends need nothing here.
    pub fn wait_for_finish<F>(&mut self, mut next_event: F)
    where
        F: FnMut() -> Option<E>,
    {
        while self.is_running() {
            let Some(packet) = next_event() else { break };
            self.on_event(&packet);
        }
    }

    /// Invokes the current protocol body to stage its next production,
    /// then applies the body's verdict.
    fn advance_current(&mut self, now: u64) {
        let Some(running) = self.current.as_mut() else {
            return;
        };
        let name = running.protocol.name();
        let body = running.protocol.body();
        let mut script = Script::new(
            &mut running.step,
            &mut self.rules,
            &mut self.production,
            &mut self.ctx,
            now,
        );
        let ok = body(&mut script);
        let finished = script.finished();
        let fired = script.fired();
        drop(script);

        if !ok {
            warn!(protocol = name, "protocol reported failure; clearing current protocol");
            self.clear_current_protocol();
        } else if finished {
            debug!(protocol = name, "protocol finished");
            self.clear_current_protocol();
        } else if !fired {
            warn!(protocol = name, "protocol body ran no step; step index out of range");
        }
    }
}
