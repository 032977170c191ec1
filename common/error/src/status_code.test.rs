use strum::IntoEnumIterator;

use super::*;

#[test]
fn test_code_values() {
    assert_eq!(StatusCode::Success as i32, 0);
    assert_eq!(StatusCode::ValidationFailed as i32, 2000);
    assert_eq!(StatusCode::IntegrityError as i32, 3004);
    assert_eq!(StatusCode::BridgeNotRunning as i32, 11000);
    assert_eq!(StatusCode::ChatRateLimited as i32, 13001);
}

#[test]
fn test_is_success() {
    assert!(StatusCode::is_success(0));
    assert!(!StatusCode::is_success(1000));
}

#[test]
fn test_retryable_metadata() {
    assert!(StatusCode::NetworkError.is_retryable());
    assert!(StatusCode::ChatRateLimited.is_retryable());
    assert!(StatusCode::StartupTimeout.is_retryable());
    assert!(!StatusCode::ValidationFailed.is_retryable());
    assert!(!StatusCode::AuthenticationFailed.is_retryable());
    assert!(!StatusCode::IntegrityError.is_retryable());
}

#[test]
fn test_categories() {
    assert_eq!(StatusCode::BridgeNotRunning.category(), ErrorCategory::Bridge);
    assert_eq!(StatusCode::ChatSendFailed.category(), ErrorCategory::Chat);
    assert_eq!(StatusCode::RateLimited.category(), ErrorCategory::Resource);
    assert_eq!(StatusCode::ValidationFailed.category(), ErrorCategory::Validation);
    assert_eq!(StatusCode::Unknown.category(), ErrorCategory::Unknown);
}

#[test]
fn test_from_i32_round_trip() {
    for code in StatusCode::iter() {
        assert_eq!(StatusCode::from_i32(code as i32), Some(code));
    }
    assert_eq!(StatusCode::from_i32(99_999), None);
}

#[test]
fn test_name() {
    assert_eq!(StatusCode::CircuitOpen.name(), "CircuitOpen");
    assert_eq!(StatusCode::SizeLimitExceeded.name(), "SizeLimitExceeded");
}

#[test]
fn test_category_display() {
    assert_eq!(ErrorCategory::Bridge.to_string(), "bridge");
    assert_eq!(ErrorCategory::Filesystem.to_string(), "filesystem");
}
