use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;

fn policy() -> BackoffPolicy {
    BackoffPolicy::new(Duration::from_millis(100), 2.0, Duration::from_secs(5), 0.0)
}

#[test]
fn test_exponential_growth() {
    let p = policy();
    assert_eq!(p.raw_delay(1), Duration::from_millis(100));
    assert_eq!(p.raw_delay(2), Duration::from_millis(200));
    assert_eq!(p.raw_delay(3), Duration::from_millis(400));
    assert_eq!(p.raw_delay(4), Duration::from_millis(800));
}

#[test]
fn test_cap() {
    let p = policy();
    assert_eq!(p.raw_delay(20), Duration::from_secs(5));
}

#[test]
fn test_retry_after_hint_wins() {
    let p = policy();
    assert_eq!(
        p.delay(1, Some(Duration::from_secs(2))),
        Duration::from_secs(2)
    );
}

#[test]
fn test_retry_after_hint_is_capped() {
    let p = policy();
    assert_eq!(
        p.delay(1, Some(Duration::from_secs(60))),
        Duration::from_secs(5)
    );
}

#[test]
fn test_jitter_stays_in_band() {
    let p = BackoffPolicy::new(Duration::from_millis(1000), 2.0, Duration::from_secs(30), 0.2);
    for _ in 0..50 {
        let d = p.delay(1, None).as_millis() as i64;
        assert!((800..=1200).contains(&d), "jittered delay out of band: {d}");
    }
}

#[test]
fn test_no_jitter_is_deterministic() {
    let p = policy();
    assert_eq!(p.delay(3, None), Duration::from_millis(400));
}
