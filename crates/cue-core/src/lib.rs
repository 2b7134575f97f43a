// SPDX-License-Identifier: Apache-2.0
//! cue-core: cooperative production/protocol engine.
//!
//! A framework for writing event-driven wire protocols as sequential
//! step lists on targets without preemptive multitasking. A protocol is
//! a reentrant function whose steps each stage one *production*: an
//! action to perform, a set of expectation/action *rules*, and an
//! optional termination condition (*until*). The engine drives it
//! one step at a time from the host's event callback.
//!
//! The engine is event-agnostic: packets are seen through the
//! [`Envelope`] trait, and every callback is a plain function pointer
//! over the host's event type and a user context owned by the
//! [`Dispatcher`]. Rule storage is fixed-capacity inline arrays; the
//! engine allocates nothing.
//!
//! # Execution model
//!
//! Single-threaded and cooperative: everything runs on the thread that
//! delivers events. Suspension is logical: a protocol body returns to
//! the dispatcher after staging a production and is reentered (at the
//! next step, via its persistent step index) when an event completes
//! that production. Timeouts are evaluated only when an event is
//! dispatched.

#![forbid(unsafe_code)]
#![deny(missing_docs, unused_must_use)]
#![warn(rust_2018_idioms)]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

mod dispatch;
mod envelope;
mod production;
mod rule;
mod script;
mod store;

pub use dispatch::{ClockFn, Dispatcher};
pub use envelope::{CheckKind, Envelope, EventCheck};
pub use production::Disposition;
pub use rule::{EventAction, EventCondition, PerformAction, Rule, Trigger, UntilCondition};
pub use script::{Cue, Protocol, ProtocolFn, Script, StepFn, StepFunction, Steps};
pub use store::{CapacityExceeded, RuleSet, RuleStore, DEFAULT_RULE_CAPACITY};
