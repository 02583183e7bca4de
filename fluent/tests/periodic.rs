//! Periodic cadence tests, driven by a mock clock.

use std::time::Duration;

use fluent::clock::MockClock;
use fluent::fluent;
use fluent::lineage::NoopSink;
use fluent::project;
use fluent::ra::{collection, Pipeline};
use fluent::{FluentBuilder, TimePoint};

fn clocked(name: &str, address: &str, context: &zmq::Context) -> (FluentBuilder, MockClock) {
    let clock = MockClock::new();
    let mut builder = fluent(name, 0, address, context, Box::new(NoopSink)).unwrap();
    builder.with_clock(Box::new(clock.clone()));
    (builder, clock)
}

#[test]
fn fires_once_per_elapsed_period() {
    let context = zmq::Context::new();
    let (mut builder, clock) = clocked("name", "inproc://periodic", &context);
    let p = builder.periodic("p", Duration::from_millis(100)).unwrap();
    let t = builder.table::<(u64,)>("t", &["x"]).unwrap();
    builder.register_rules(vec![t.merge_rule(project!(collection(&p), 0))]);
    let mut f = builder.build().unwrap();

    let mut ids = Vec::new();
    for _ in 0 .. 10 {
        clock.advance(Duration::from_millis(100));
        f.receive().unwrap();
        let firings = p.rows();
        assert_eq!(firings.len(), 1);
        ids.push(firings[0].0);
        f.tick().unwrap();
        assert_eq!(p.rows(), vec![]);
    }

    // Ten receive cycles over ten periods: ten firings with fresh,
    // monotonically increasing ids, all landed in t through the rule.
    assert_eq!(ids, (0 .. 10).collect::<Vec<_>>());
    assert_eq!(t.rows().len(), 10);
}

#[test]
fn several_missed_deadlines_collapse_into_one_firing() {
    let context = zmq::Context::new();
    let (mut builder, clock) = clocked("name", "inproc://missed", &context);
    let p = builder.periodic("p", Duration::from_millis(100)).unwrap();
    let mut f = builder.build().unwrap();

    // Three periods elapse before the node gets around to receiving; the
    // periodic fires once and reschedules from now.
    clock.advance(Duration::from_millis(350));
    f.receive().unwrap();
    assert_eq!(p.rows().len(), 1);
    f.tick().unwrap();

    clock.advance(Duration::from_millis(99));
    f.receive().unwrap();
    assert_eq!(p.rows(), vec![]);

    clock.advance(Duration::from_millis(1));
    f.receive().unwrap();
    assert_eq!(p.rows().len(), 1);
}

#[test]
fn periodics_drive_channel_sends() {
    let context = zmq::Context::new();
    let (mut builder, clock) = clocked("ticker", "inproc://ticker", &context);
    let p = builder.periodic("p", Duration::from_millis(100)).unwrap();
    let c = builder
        .channel::<(String, String)>("c", &["addr", "msg"])
        .unwrap();
    builder.register_rules(vec![c.merge_rule(collection(&p).map(
        |_: (u64, TimePoint)| ("inproc://tock".to_string(), "tick".to_string()),
    ))]);
    let mut ticker = builder.build().unwrap();

    let mut builder = fluent("tock", 1, "inproc://tock", &context, Box::new(NoopSink)).unwrap();
    let inbox = builder
        .channel::<(String, String)>("c", &["addr", "msg"])
        .unwrap();
    let mut tock = builder.build().unwrap();

    let mut received = 0;
    for _ in 0 .. 10 {
        clock.advance(Duration::from_millis(100));
        ticker.receive().unwrap();
        ticker.tick().unwrap();
        tock.receive().unwrap();
        received += inbox.rows().len();
        tock.tick().unwrap();
        assert_eq!(inbox.rows(), vec![]);
    }
    assert_eq!(received, 10);
}

#[test]
fn independent_periodics_fire_independently() {
    let context = zmq::Context::new();
    let (mut builder, clock) = clocked("name", "inproc://two", &context);
    let fast = builder.periodic("fast", Duration::from_millis(10)).unwrap();
    let slow = builder.periodic("slow", Duration::from_millis(40)).unwrap();
    let mut f = builder.build().unwrap();

    let mut fast_firings = 0;
    let mut slow_firings = 0;
    for _ in 0 .. 4 {
        clock.advance(Duration::from_millis(10));
        f.receive().unwrap();
        fast_firings += fast.rows().len();
        slow_firings += slow.rows().len();
        f.tick().unwrap();
    }
    assert_eq!(fast_firings, 4);
    assert_eq!(slow_firings, 1);
}
