#![allow(clippy::unwrap_used)]

use std::sync::atomic::AtomicUsize;

use super::*;
use pretty_assertions::assert_eq;

fn unit() -> Arc<str> {
    Arc::from("unit")
}

#[test]
fn listener_receives_published_events() {
    let channel = DebugChannel::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    channel.subscribe(Arc::new(move |event: &DebugEvent| {
        sink.lock().push(event.level());
    }));

    channel.log(&unit(), LogLevel::Info, "folded 3 constant expressions");
    channel.publish(DebugEvent::Runtime(RuntimeEvent::Released { unit: unit() }));

    assert_eq!(*seen.lock(), vec![LogLevel::Info, LogLevel::Info]);
    assert_eq!(channel.dropped_count(), 0);
}

#[test]
fn unsubscribed_listener_is_not_called() {
    let channel = DebugChannel::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = channel.subscribe(Arc::new(move |_: &DebugEvent| {
        counter.fetch_add(1, Ordering::Relaxed);
    }));

    channel.log(&unit(), LogLevel::Debug, "one");
    assert!(channel.unsubscribe(id));
    assert!(!channel.unsubscribe(id));
    channel.log(&unit(), LogLevel::Debug, "two");

    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn events_without_consumers_are_dropped() {
    let channel = DebugChannel::new();
    channel.log(&unit(), LogLevel::Trace, "nobody listens");
    assert_eq!(channel.published_count(), 1);
    assert_eq!(channel.dropped_count(), 1);
}

#[test]
fn full_bounded_receiver_drops_and_counts() {
    let channel = DebugChannel::new();
    let rx = channel.bounded_receiver(2);
    for i in 0..5 {
        channel.log(&unit(), LogLevel::Info, format!("event {i}"));
    }
    assert_eq!(rx.len(), 2);
    assert_eq!(channel.dropped_count(), 3);

    let first = rx.try_recv().unwrap();
    assert!(matches!(first, DebugEvent::Trace { ref message, .. } if message == "event 0"));
}

#[test]
fn dropped_receiver_is_detached() {
    let channel = DebugChannel::new();
    drop(channel.bounded_receiver(4));
    channel.log(&unit(), LogLevel::Info, "after drop");
    assert_eq!(channel.dropped_count(), 1);
}
