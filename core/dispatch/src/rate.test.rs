use pretty_assertions::assert_eq;

use super::*;

fn limiter(capacity: u32, refill: f64) -> RateLimiter {
    RateLimiter::new(&RateLimitConfig {
        capacity,
        refill_per_sec: refill,
        queue_high_water: 10,
        webhook_per_minute: 60,
    })
}

#[test]
fn test_bucket_starts_full() {
    let limiter = limiter(3, 0.0);
    assert!(limiter.try_acquire("chat"));
    assert!(limiter.try_acquire("chat"));
    assert!(limiter.try_acquire("chat"));
    assert!(!limiter.try_acquire("chat"));
}

#[test]
fn test_targets_are_independent() {
    let limiter = limiter(1, 0.0);
    assert!(limiter.try_acquire("a"));
    assert!(!limiter.try_acquire("a"));
    assert!(limiter.try_acquire("b"));
}

#[test]
fn test_refill_over_time() {
    let limiter = limiter(1, 50.0);
    assert!(limiter.try_acquire("chat"));
    assert!(!limiter.try_acquire("chat"));
    std::thread::sleep(std::time::Duration::from_millis(40));
    assert!(limiter.try_acquire("chat"));
}

#[test]
fn test_available_gauge() {
    let limiter = limiter(5, 0.0);
    assert_eq!(limiter.available("chat"), 5.0);
    limiter.try_acquire("chat");
    assert!(limiter.available("chat") < 5.0);
}
