// SPDX-License-Identifier: MIT

use super::*;

fn tick(payload: &str) -> Event {
    Event::Tick {
        payload: payload.to_string(),
    }
}

fn focus(con_id: i64) -> Event {
    Event::WindowFocus {
        con_id,
        workspace: None,
    }
}

#[test]
fn ids_are_strictly_monotonic() {
    let mut ring = EventRing::new(10);
    let a = ring.add(tick("a"), Source::Wm, 1);
    let b = ring.add(focus(1), Source::Wm, 2);
    let c = ring.add(tick("c"), Source::Daemon, 3);

    assert_eq!(a.event_id, 1);
    assert_eq!(b.event_id, 2);
    assert_eq!(c.event_id, 3);
}

#[test]
fn eviction_at_capacity_keeps_ids_monotonic() {
    let mut ring = EventRing::new(3);
    for i in 0..3 {
        ring.add(tick(&i.to_string()), Source::Wm, i);
    }
    assert_eq!(ring.stats().buffer_size, 3);

    // One more evicts exactly the oldest
    let entry = ring.add(tick("overflow"), Source::Wm, 99);
    assert_eq!(entry.event_id, 4);

    let stats = ring.stats();
    assert_eq!(stats.buffer_size, 3);
    assert_eq!(stats.total_events, 4);

    let all = ring.query(10, None, None);
    assert_eq!(all.len(), 3);
    // Oldest surviving entry is id 2
    assert_eq!(all.last().map(|e| e.event_id), Some(2));
    assert_eq!(ring.get(1), None);
}

#[test]
fn query_filters_by_type_prefix() {
    let mut ring = EventRing::new(10);
    ring.add(focus(1), Source::Wm, 1);
    ring.add(tick("t"), Source::Wm, 2);
    ring.add(focus(2), Source::Wm, 3);

    let windows = ring.query(10, Some("window"), None);
    assert_eq!(windows.len(), 2);
    assert!(windows
        .iter()
        .all(|e| e.event.event_type().starts_with("window")));

    // Most recent first
    assert_eq!(windows[0].event_id, 3);
    assert_eq!(windows[1].event_id, 1);
}

#[test]
fn query_respects_since_id_and_limit() {
    let mut ring = EventRing::new(10);
    for i in 0..6 {
        ring.add(tick(&i.to_string()), Source::Wm, i);
    }

    let newer = ring.query(10, None, Some(4));
    assert_eq!(
        newer.iter().map(|e| e.event_id).collect::<Vec<_>>(),
        vec![6, 5]
    );

    let limited = ring.query(2, None, None);
    assert_eq!(
        limited.iter().map(|e| e.event_id).collect::<Vec<_>>(),
        vec![6, 5]
    );
}

#[test]
fn get_by_id() {
    let mut ring = EventRing::new(10);
    ring.add(tick("a"), Source::Wm, 1);
    ring.add(tick("b"), Source::Ipc, 2);

    let entry = ring.get(2).unwrap();
    assert_eq!(entry.source, Source::Ipc);
    assert_eq!(ring.get(99), None);
}

#[test]
fn entry_serializes_flattened() {
    let mut ring = EventRing::new(10);
    let entry = ring.add(focus(7), Source::Wm, 123);

    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["event_id"], 1);
    assert_eq!(json["timestamp_ms"], 123);
    assert_eq!(json["source"], "wm");
    assert_eq!(json["type"], "window::focus");
    assert_eq!(json["con_id"], 7);
}
