// SPDX-License-Identifier: MIT

use super::*;
use i3pm_core::FakeClock;

fn registry() -> (LaunchRegistry, FakeClock) {
    let clock = FakeClock::new(1_000_000);
    let registry = LaunchRegistry::new(Arc::new(clock.clone()));
    (registry, clock)
}

#[test]
fn add_and_match() {
    let (mut registry, clock) = registry();
    registry
        .add("zed", Some("P"), "Zed", Some(5))
        .unwrap();

    clock.advance(300);
    let matched = registry.find_match("Zed", Some(5)).unwrap();

    assert_eq!(matched.launch.app_name, "zed");
    assert_eq!(matched.launch.project.as_deref(), Some("P"));
    assert_eq!(matched.correlation.confidence, 1.0);
    assert!(matched.correlation.signals.workspace_match);

    let stats = registry.stats();
    assert_eq!(stats.total_notifications, 1);
    assert_eq!(stats.total_matched, 1);
}

#[test]
fn matched_launch_is_not_reused() {
    let (mut registry, clock) = registry();
    registry.add("zed", Some("P"), "Zed", Some(5)).unwrap();
    clock.advance(100);

    assert!(registry.find_match("Zed", Some(5)).is_some());
    assert!(registry.find_match("Zed", Some(5)).is_none());
    assert_eq!(registry.stats().total_failed_correlations, 1);
}

#[test]
fn class_mismatch_finds_nothing() {
    let (mut registry, clock) = registry();
    registry.add("zed", Some("P"), "Zed", Some(5)).unwrap();
    clock.advance(100);

    assert!(registry.find_match("firefox", Some(5)).is_none());
}

#[test]
fn launches_expire_after_ttl() {
    let (mut registry, clock) = registry();
    registry.add("zed", Some("P"), "Zed", Some(5)).unwrap();

    clock.advance(DEFAULT_LAUNCH_TTL_MS + 1);
    assert!(registry.find_match("Zed", Some(5)).is_none());

    let stats = registry.stats();
    assert_eq!(stats.total_expired, 1);
    assert_eq!(stats.pending, 0);
}

#[test]
fn no_pending_launch_is_older_than_ttl_after_any_operation() {
    let (mut registry, clock) = registry();
    registry.add("a", None, "A", None).unwrap();
    clock.advance(DEFAULT_LAUNCH_TTL_MS + 500);
    registry.add("b", None, "B", None).unwrap();

    let pending = registry.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].app_name, "b");
}

#[test]
fn tie_breaks_to_earliest_launch() {
    let (mut registry, clock) = registry();
    registry.add("zed", Some("first"), "Zed", Some(5)).unwrap();
    clock.advance(10);
    registry.add("zed", Some("second"), "Zed", Some(5)).unwrap();
    clock.advance(100);

    // Both launches are <1s old with identical signals; earliest wins
    let matched = registry.find_match("Zed", Some(5)).unwrap();
    assert_eq!(matched.launch.project.as_deref(), Some("first"));
}

#[test]
fn higher_confidence_beats_earlier_launch() {
    let (mut registry, clock) = registry();
    // Earlier launch on another workspace (no workspace bonus)
    registry.add("zed", Some("elsewhere"), "Zed", Some(9)).unwrap();
    clock.advance(10);
    registry.add("zed", Some("here"), "Zed", Some(5)).unwrap();
    clock.advance(100);

    let matched = registry.find_match("Zed", Some(5)).unwrap();
    assert_eq!(matched.launch.project.as_deref(), Some("here"));
}

#[test]
fn capacity_rejects_new_launches() {
    let (mut registry, _clock) = registry();
    for i in 0..MAX_PENDING {
        registry.add(&format!("app{i}"), None, "C", None).unwrap();
    }

    match registry.add("overflow", None, "C", None) {
        Err(LaunchRegistryError::Full { max }) => assert_eq!(max, MAX_PENDING),
        other => panic!("expected Full error, got {other:?}"),
    }
}

#[test]
fn pending_is_sorted_oldest_first() {
    let (mut registry, clock) = registry();
    registry.add("b", None, "B", None).unwrap();
    clock.advance(50);
    registry.add("a", None, "A", None).unwrap();

    let pending = registry.pending();
    assert_eq!(pending[0].app_name, "b");
    assert_eq!(pending[1].app_name, "a");
}
