// SPDX-License-Identifier: Apache-2.0
//! Expectation/action rules.
//!
//! A rule pairs a trigger (when does it fire) with an optional action
//! (what to do when it fires). Rules are plain data: the callbacks are
//! function pointers over the host's event type `E` and context `C`, so
//! a rule is `Copy` and lives happily inside fixed-capacity storage.

use tracing::debug;

use crate::envelope::{Envelope, EventCheck};

/// Action run when a rule's trigger matches an event.
///
/// The return value is informational in this release: a `false` return
/// is logged and otherwise ignored. Only a failed perform aborts a
/// protocol.
pub type EventAction<E, C> = fn(&E, &mut C) -> bool;

/// Predicate deciding whether a condition-triggered rule fires.
pub type EventCondition<E> = fn(&E) -> bool;

/// The side-effecting call that starts a production. Run at most once
/// per production, before any rule evaluation; returning `false` aborts
/// the current protocol.
pub type PerformAction<C> = fn(&mut C) -> bool;

/// Termination predicate for a production.
pub type UntilCondition<E> = fn(&E) -> bool;

/// When a rule fires.
pub enum Trigger<E> {
    /// Never fires. The inert placeholder used by empty rule slots.
    Never,
    /// Fires when the tagged event check matches.
    Check(EventCheck),
    /// Fires when the predicate returns true.
    When(EventCondition<E>),
}

impl<E> Clone for Trigger<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Trigger<E> {}

impl<E> core::fmt::Debug for Trigger<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Never => f.write_str("Never"),
            Self::Check(check) => f.debug_tuple("Check").field(check).finish(),
            Self::When(_) => f.write_str("When(..)"),
        }
    }
}

/// One expectation/action pair.
pub struct Rule<E, C> {
    trigger: Trigger<E>,
    action: Option<EventAction<E, C>>,
}

impl<E, C> Clone for Rule<E, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, C> Copy for Rule<E, C> {}

impl<E, C> core::fmt::Debug for Rule<E, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rule")
            .field("trigger", &self.trigger)
            .field("has_action", &self.action.is_some())
            .finish_non_exhaustive()
    }
}

impl<E, C> Rule<E, C> {
    /// Inert rule occupying an empty storage slot.
    pub(crate) const INERT: Self = Self { trigger: Trigger::Never, action: None };

    /// Rule firing `action` when `check` matches.
    #[must_use]
    pub const fn on(check: EventCheck, action: EventAction<E, C>) -> Self {
        Self { trigger: Trigger::Check(check), action: Some(action) }
    }

    /// Rule firing `action` when `condition` holds.
    #[must_use]
    pub const fn when(condition: EventCondition<E>, action: EventAction<E, C>) -> Self {
        Self { trigger: Trigger::When(condition), action: Some(action) }
    }

    /// Action-less rule: matching it satisfies the expectation (so
    /// `met_expectations` reports true) without doing anything else.
    #[must_use]
    pub const fn watch(check: EventCheck) -> Self {
        Self { trigger: Trigger::Check(check), action: None }
    }

    /// Action-less condition rule.
    #[must_use]
    pub const fn watch_when(condition: EventCondition<E>) -> Self {
        Self { trigger: Trigger::When(condition), action: None }
    }

    /// The rule's trigger.
    #[must_use]
    pub const fn trigger(&self) -> Trigger<E> {
        self.trigger
    }
}

impl<E: Envelope, C> Rule<E, C> {
    /// Evaluates the trigger against `event`; runs the action on a
    /// match. Returns whether the rule fired.
    pub(crate) fn fire(&self, event: &E, ctx: &mut C) -> bool {
        let matched = match self.trigger {
            Trigger::Never => false,
            Trigger::Check(check) => check.matches(event),
            Trigger::When(condition) => condition(event),
        };
        if matched {
            if let Some(action) = self.action {
                if !action(event, ctx) {
                    debug!("event action reported failure (informational)");
                }
            }
        }
        matched
    }
}
