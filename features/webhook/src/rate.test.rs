use super::*;

#[test]
fn test_allows_up_to_limit() {
    let limiter = SourceRateLimiter::per_minute(3);
    assert!(limiter.allow("user-1"));
    assert!(limiter.allow("user-1"));
    assert!(limiter.allow("user-1"));
    assert!(!limiter.allow("user-1"));
}

#[test]
fn test_sources_are_independent() {
    let limiter = SourceRateLimiter::per_minute(1);
    assert!(limiter.allow("user-1"));
    assert!(!limiter.allow("user-1"));
    assert!(limiter.allow("user-2"));
}
