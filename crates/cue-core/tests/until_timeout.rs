// SPDX-License-Identifier: Apache-2.0
//! Production termination: until predicates, until event matches, and
//! cooperative timeouts.

mod common;

use common::{a1, set_now, test_clock, Recorder, TestEvent};
use cue_core::{Dispatcher, Disposition, EventCheck, Rule};

fn dispatcher() -> Dispatcher<TestEvent, Recorder> {
    set_now(0);
    Dispatcher::new(Recorder::default(), test_clock)
}

fn code_is_3(event: &TestEvent) -> bool {
    event.code == 0x03
}

#[test]
fn until_predicate_keeps_the_production_alive() {
    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::event(0x02), a1));
    d.until(code_is_3);

    assert_eq!(d.on_event(&TestEvent::event(0x02)), Disposition::Advanced);
    assert_eq!(d.on_event(&TestEvent::event(0x02)), Disposition::Advanced);
    assert_eq!(d.on_event(&TestEvent::event(0x03)), Disposition::Done);
    assert_eq!(d.context().fired, vec!["a1", "a1"]);

    // Normal rules are cleared by completion.
    d.on_event(&TestEvent::event(0x02));
    assert_eq!(d.context().fired, vec!["a1", "a1"]);
}

#[test]
fn until_event_match_completes_the_production() {
    let mut d = dispatcher();
    d.until_event(EventCheck::event(0x09));

    assert_eq!(d.on_event(&TestEvent::event(0x01)), Disposition::NoMatch);
    assert_eq!(d.on_event(&TestEvent::event(0x09)), Disposition::Done);
}

#[test]
fn timeout_races_the_until_event() {
    let mut d = dispatcher();
    d.until_event(EventCheck::event(0x09));
    d.timeout_ms(100);

    set_now(50);
    assert_eq!(d.on_event(&TestEvent::event(0x01)), Disposition::NoMatch);

    // The until event never arrives, but the clock wins the race.
    set_now(150);
    assert_eq!(d.on_event(&TestEvent::event(0x01)), Disposition::Done);
}

#[test]
fn zero_timeout_completes_on_the_first_event() {
    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::event(0x99), a1));
    d.timeout_ms(0);

    let disposition = d.on_event(&TestEvent::event(0x01));

    assert_eq!(disposition, Disposition::Done, "regardless of rule outcome");
    assert!(d.context().fired.is_empty());
}

#[test]
fn timeout_alone_is_a_termination_source() {
    let mut d = dispatcher();
    d.timeout_ms(100);

    set_now(10);
    assert_eq!(d.on_event(&TestEvent::event(0x01)), Disposition::NoMatch);
    set_now(100);
    assert_eq!(d.on_event(&TestEvent::event(0x01)), Disposition::Done);
}

#[test]
fn always_true_until_makes_a_production_single_pass() {
    fn yes(_: &TestEvent) -> bool {
        true
    }

    let mut d = dispatcher();
    d.expect(Rule::on(EventCheck::event(0x02), a1));
    d.until(yes);

    assert_eq!(d.on_event(&TestEvent::event(0x02)), Disposition::Done);
    assert_eq!(d.context().fired, vec!["a1"], "the rule still fires on the closing event");
}

#[test]
fn junk_packets_do_not_trip_the_until_condition() {
    fn yes(_: &TestEvent) -> bool {
        true
    }

    let mut d = dispatcher();
    d.until(yes);

    assert_eq!(d.on_event(&TestEvent::junk()), Disposition::NoMatch);
    assert_eq!(d.on_event(&TestEvent::event(0x01)), Disposition::Done);
}

#[test]
fn timeout_expiry_on_a_junk_packet_is_ignored() {
    let mut d = dispatcher();
    d.timeout_ms(10);

    set_now(500);
    assert_eq!(
        d.on_event(&TestEvent::junk()),
        Disposition::NoMatch,
        "non-event packets never finish a production"
    );
    assert_eq!(d.on_event(&TestEvent::event(0x01)), Disposition::Done);
}
