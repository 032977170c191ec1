use coderelay_error::ErrorContext;
use pretty_assertions::assert_eq;

use super::*;

fn record(code: StatusCode, message: &str) -> ErrorRecord {
    ErrorRecord::new(code, message, ErrorContext::new("chat_send", "dispatch"))
}

#[test]
fn test_exact_code_match_scores_full() {
    let pattern = PatternBuilder::new("p")
        .when(Matcher::Code(StatusCode::ChatRateLimited), 3.0)
        .build();
    let r = record(StatusCode::ChatRateLimited, "429");
    assert_eq!(pattern.score(&r), 1.0);
}

#[test]
fn test_partial_match_is_fractional() {
    let pattern = PatternBuilder::new("p")
        .when(Matcher::Code(StatusCode::ChatRateLimited), 3.0)
        .when(Matcher::MessageContains("rate limit".to_string()), 1.0)
        .build();

    // Code matches, message does not: 3/4.
    let r = record(StatusCode::ChatRateLimited, "too many requests");
    assert_eq!(pattern.score(&r), 0.75);
}

#[test]
fn test_no_match_scores_zero() {
    let pattern = PatternBuilder::new("p")
        .when(Matcher::Code(StatusCode::IntegrityError), 1.0)
        .build();
    let r = record(StatusCode::NetworkError, "connection reset");
    assert_eq!(pattern.score(&r), 0.0);
}

#[test]
fn test_message_contains_is_case_insensitive() {
    let m = Matcher::MessageContains("Rate Limit".to_string());
    assert!(m.matches(&record(StatusCode::Unknown, "RATE LIMIT exceeded")));
}

#[test]
fn test_metadata_key_matcher() {
    let m = Matcher::MetadataKey("retry_after_ms".to_string());
    let r = ErrorRecord::new(
        StatusCode::ChatRateLimited,
        "429",
        ErrorContext::new("chat_send", "dispatch")
            .with_metadata("retry_after_ms", serde_json::json!(2000)),
    );
    assert!(m.matches(&r));
    assert!(!m.matches(&record(StatusCode::ChatRateLimited, "429")));
}

#[test]
fn test_component_and_operation_matchers() {
    let r = record(StatusCode::Unknown, "boom");
    assert!(Matcher::Component("dispatch".to_string()).matches(&r));
    assert!(Matcher::Operation("chat_send".to_string()).matches(&r));
    assert!(!Matcher::Component("webhook".to_string()).matches(&r));
}

#[test]
fn test_default_patterns_cover_key_codes() {
    let patterns = default_patterns();
    let rate_limited = record(StatusCode::ChatRateLimited, "rate limit");
    let best = patterns
        .iter()
        .max_by(|a, b| a.score(&rate_limited).total_cmp(&b.score(&rate_limited)))
        .map(|p| p.id.clone());
    assert_eq!(best.as_deref(), Some("chat_rate_limit"));

    let integrity = record(StatusCode::IntegrityError, "bad checksum");
    let best = patterns
        .iter()
        .max_by(|a, b| a.score(&integrity).total_cmp(&b.score(&integrity)))
        .map(|p| p.id.clone());
    assert_eq!(best.as_deref(), Some("spool_integrity"));
}

#[test]
fn test_regex_matcher_catches_5xx() {
    let patterns = default_patterns();
    let pattern = patterns
        .iter()
        .find(|p| p.id == "remote_server_error")
        .map(|p| p.score(&record(StatusCode::RemoteServerError, "upstream returned 503")));
    assert_eq!(pattern, Some(1.0));
}
