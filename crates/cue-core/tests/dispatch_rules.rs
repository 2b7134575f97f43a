// SPDX-License-Identifier: Apache-2.0
//! Rule firing precedence and the direct (protocol-less) production
//! surface of the dispatcher.

mod common;

use common::{
    a1, a2, a3, a_global, always, failing_action, perform_ok, test_clock, Recorder, TestEvent,
};
use cue_core::{Dispatcher, Disposition, EventCheck, Rule};

type TestDispatcher = Dispatcher<TestEvent, Recorder>;

fn dispatcher() -> TestDispatcher {
    Dispatcher::new(Recorder::default(), test_clock)
}

#[test]
fn single_shot_perform_only() {
    let mut d = dispatcher();
    d.perform(perform_ok, "perform_ok");

    let disposition = d.on_event(&TestEvent::event(0x05));

    assert_eq!(disposition, Disposition::Done, "no until means single-shot");
    assert_eq!(d.context().performs, vec!["perform_ok"]);
    assert!(!d.met_expectations());
    assert!(!d.is_running());

    // The perform was consumed; the next production does not rerun it.
    d.on_event(&TestEvent::event(0x05));
    assert_eq!(d.context().performs, vec!["perform_ok"]);
}

#[test]
fn exclusive_fires_before_normals_and_all_normals_fire() {
    let mut d = dispatcher();
    d.expect_exclusive(Rule::on(EventCheck::event(0x10), a1));
    d.expect(Rule::on(EventCheck::event(0x10), a2));
    d.expect(Rule::on(EventCheck::event(0x10), a3));

    let disposition = d.on_event(&TestEvent::event(0x10));

    assert_eq!(disposition, Disposition::Done);
    assert_eq!(d.context().fired, vec!["a1", "a2", "a3"]);
    assert!(d.met_expectations());
}

#[test]
fn only_the_first_matching_exclusive_fires() {
    let mut d = dispatcher();
    d.expect_exclusive(Rule::on(EventCheck::event(0x10), a1));
    d.expect_exclusive(Rule::on(EventCheck::event(0x10), a2));

    d.on_event(&TestEvent::event(0x10));

    assert_eq!(d.context().fired, vec!["a1"]);
}

#[test]
fn normals_fire_in_insertion_order_skipping_non_matches() {
    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::event(0x10), a1));
    d.expect(Rule::on(EventCheck::event(0x99), a2));
    d.expect(Rule::when(always, a3));

    d.on_event(&TestEvent::event(0x10));

    assert_eq!(d.context().fired, vec!["a1", "a3"]);
}

#[test]
fn global_fires_only_as_fallback() {
    let mut d = dispatcher();
    d.expect_global(Rule::when(always, a_global));

    let disposition = d.on_event(&TestEvent::event(0x42));

    assert_eq!(disposition, Disposition::Done);
    assert_eq!(d.context().fired, vec!["a_global"]);
    assert!(!d.met_expectations(), "globals never satisfy expectations");
}

#[test]
fn global_suppressed_when_an_expectation_matches() {
    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::event(0x10), a1));
    d.expect_global(Rule::when(always, a_global));
    d.until_event(EventCheck::event(0x11));

    d.on_event(&TestEvent::event(0x10));
    assert_eq!(d.context().fired, vec!["a1"], "global must not fire alongside a match");

    // Once nothing matches, the fallback kicks in.
    d.on_event(&TestEvent::event(0x42));
    assert_eq!(d.context().fired, vec!["a1", "a_global"]);
}

#[test]
fn deeper_check_kinds_match_through_the_envelope() {
    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::meta_subevent(0x02), a1));
    d.expect(Rule::on(EventCheck::vendor(0x0407), a2));
    d.until_event(EventCheck::event(0x05));

    d.on_event(&TestEvent::meta(0x02));
    d.on_event(&TestEvent::vendor(0x0407));
    d.on_event(&TestEvent::event(0x05));

    assert_eq!(d.context().fired, vec!["a1", "a2"]);
}

#[test]
fn non_event_packet_is_a_no_op() {
    let mut d = dispatcher();
    d.perform(perform_ok, "perform_ok");
    d.expect(Rule::when(always, a1));
    d.until_event(EventCheck::event(0x11));

    let disposition = d.on_event(&TestEvent::junk());

    assert_eq!(disposition, Disposition::NoMatch);
    assert!(d.context().performs.is_empty(), "perform must survive a junk packet");
    assert!(d.context().fired.is_empty());

    // The next real event consumes the perform and fires the rule.
    d.on_event(&TestEvent::event(0x10));
    assert_eq!(d.context().performs, vec!["perform_ok"]);
    assert_eq!(d.context().fired, vec!["a1"]);
}

#[test]
fn perform_runs_before_any_rule() {
    fn perform_marker(ctx: &mut Recorder) -> bool {
        ctx.fired.push("perform");
        true
    }

    let mut d = dispatcher();
    d.perform(perform_marker, "perform_marker");
    d.expect(Rule::when(always, a1));

    d.on_event(&TestEvent::event(0x10));

    assert_eq!(d.context().fired, vec!["perform", "a1"]);
}

#[test]
fn overflowing_adds_are_dropped_and_dispatch_still_completes() {
    let mut d = dispatcher();
    // Default capacity is 20 per set; the two extra adds are dropped.
    for _ in 0..22 {
        d.expect(Rule::on(EventCheck::event(0x10), a1));
    }

    let disposition = d.on_event(&TestEvent::event(0x10));

    assert_eq!(disposition, Disposition::Done);
    assert_eq!(d.context().fired.len(), 20);
}

#[test]
fn action_failure_is_informational() {
    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::event(0x10), failing_action));
    d.until_event(EventCheck::event(0x11));

    let disposition = d.on_event(&TestEvent::event(0x10));

    assert_eq!(disposition, Disposition::Advanced, "a false action return aborts nothing");
    assert_eq!(d.context().fired, vec!["failing_action"]);
    assert!(d.met_expectations());
}

#[test]
fn expectations_met_resets_with_the_next_production() {
    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::event(0x10), a1));

    d.on_event(&TestEvent::event(0x10));
    assert!(d.met_expectations(), "readable after Done");

    // First event of the next production starts from a clean flag.
    d.on_event(&TestEvent::event(0x42));
    assert!(!d.met_expectations());
}

#[test]
fn clear_expectations_resets_the_met_flag() {
    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::event(0x10), a1));
    d.until_event(EventCheck::event(0x11));
    d.on_event(&TestEvent::event(0x10));
    assert!(d.met_expectations());

    d.clear_expectations();
    assert!(!d.met_expectations());
}
