// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.now_ms();
    let b = clock.now_ms();
    assert!(b >= a);
    assert!(a > 1_600_000_000_000, "expected a post-2020 timestamp");
}

#[test]
fn fake_clock_set_and_advance() {
    let clock = FakeClock::new(1_000);
    assert_eq!(clock.now_ms(), 1_000);

    clock.advance(250);
    assert_eq!(clock.now_ms(), 1_250);

    clock.set(5_000);
    assert_eq!(clock.now_ms(), 5_000);
    assert_eq!(clock.now_secs(), 5);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new(0);
    let other = clock.clone();
    clock.advance(42);
    assert_eq!(other.now_ms(), 42);
}
