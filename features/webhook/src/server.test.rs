#![allow(clippy::unwrap_used)]

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use coderelay_config::LimitsConfig;
use coderelay_config::RateLimitConfig;
use coderelay_dispatch::Notice;
use coderelay_protocol::Event;
use coderelay_protocol::EventType;
use coderelay_spool::SpoolOptions;
use coderelay_spool::SpoolSet;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use super::*;

const TEST_KEY: &str = "test-api-key";

fn dispatch(dir: &tempfile::TempDir) -> Arc<DispatchPipeline> {
    let spool = Arc::new(
        SpoolSet::open(
            dir.path(),
            SpoolOptions {
                ttl: Duration::from_secs(3600),
                max_records: 1000,
                compression_threshold_bytes: 512,
            },
        )
        .unwrap(),
    );
    Arc::new(DispatchPipeline::new(
        spool,
        LimitsConfig::default(),
        &RateLimitConfig::default(),
        32,
    ))
}

struct FlakyAck {
    calls: AtomicU32,
    fail: bool,
}

#[async_trait]
impl ChatAcknowledger for FlakyAck {
    async fn acknowledge(&self, _response: &Response) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err("chat unreachable".to_string())
        } else {
            Ok(())
        }
    }
}

fn state_with(
    dispatch: Arc<DispatchPipeline>,
    ack: Arc<dyn ChatAcknowledger>,
    auth_enabled: bool,
) -> Arc<WebhookState> {
    WebhookState::new(
        dispatch,
        ack,
        AuthConfig {
            api_key: Some(TEST_KEY.to_string()),
            enable: auth_enabled,
        },
        coderelay_config::LogConfig::default(),
        60,
    )
}

fn approve_body(callback_data: &str) -> String {
    serde_json::json!({
        "type": "telegram_response",
        "callback_data": callback_data,
        "user_id": 297126051,
        "first_name": "Test",
        "timestamp": "2025-01-01T12:00:00Z"
    })
    .to_string()
}

fn post_request(body: String, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook/bridge-response")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_approve_callback_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);

    // Preload the approval request this callback answers.
    dispatch
        .send_event(
            Event::new(EventType::ApprovalRequest, "claude-code", "Deploy?", "v1.2")
                .with_task_id("t-42"),
        )
        .unwrap();

    let mut subscriber = dispatch.fanout().subscribe();
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let app = router(state_with(dispatch.clone(), ack.clone(), true));

    let response = app
        .oneshot(post_request(approve_body("approve_t-42"), Some(TEST_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["action"], "approve");
    assert_eq!(body["task_id"], "t-42");
    assert_eq!(body["acknowledgement_sent"], true);
    assert!(body["correlation_id"].as_str().is_some());

    // Exactly one response file, one chat-ack dispatch, one notification.
    assert_eq!(dispatch.spool().responses().len().unwrap(), 1);
    assert_eq!(ack.calls.load(Ordering::SeqCst), 1);

    let mut notices = subscriber.drain();
    // The ack itself produced an event-accepted notification; find the
    // response notification.
    let response_notice = notices
        .drain(..)
        .find(|n| matches!(n, Notice::Notification(n) if n.response.is_some()));
    match response_notice {
        Some(Notice::Notification(n)) => {
            assert_eq!(n.response.unwrap().task_id, "t-42");
        }
        _ => panic!("subscriber did not receive the response notification"),
    }
}

#[tokio::test]
async fn test_unknown_callback_still_stored() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let mut subscriber = dispatch.fanout().subscribe();
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let app = router(state_with(dispatch.clone(), ack.clone(), true));

    let response = app
        .oneshot(post_request(approve_body("garbage"), Some(TEST_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["action"], "unknown");
    assert_eq!(body["acknowledgement_sent"], false);

    // Stored with action unknown, no chat ack, subscriber notified.
    let stored = dispatch.spool().responses().iterate(None).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].record.action,
        coderelay_protocol::ResponseAction::Unknown
    );
    assert_eq!(ack.calls.load(Ordering::SeqCst), 0);
    assert_eq!(subscriber.drain().len(), 1);
}

#[tokio::test]
async fn test_ack_failure_does_not_fail_request() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: true,
    });
    let app = router(state_with(dispatch.clone(), ack, true));

    let response = app
        .oneshot(post_request(approve_body("approve_t-1"), Some(TEST_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["acknowledgement_sent"], false);
    // The response is still recorded.
    assert_eq!(dispatch.spool().responses().len().unwrap(), 1);
}

#[tokio::test]
async fn test_missing_api_key_is_401() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let app = router(state_with(dispatch, ack, true));

    let response = app
        .oneshot(post_request(approve_body("approve_t-1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "AUTH_HEADER_NOT_FOUND");
}

#[tokio::test]
async fn test_wrong_api_key_is_401() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let app = router(state_with(dispatch, ack, true));

    let response = app
        .oneshot(post_request(approve_body("approve_t-1"), Some("nope")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "AUTHENTICATION_FAILED");
}

#[tokio::test]
async fn test_auth_disabled_skips_key_check() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let app = router(state_with(dispatch, ack, false));

    let response = app
        .oneshot(post_request(approve_body("approve_t-1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let app = router(state_with(dispatch, ack, true));

    let response = app
        .oneshot(post_request("{not json".to_string(), Some(TEST_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_wrong_payload_type_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let app = router(state_with(dispatch, ack, true));

    let body = serde_json::json!({
        "type": "something_else",
        "callback_data": "approve_t-1",
        "user_id": 1,
        "timestamp": "2025-01-01T12:00:00Z"
    })
    .to_string();

    let response = app.oneshot(post_request(body, Some(TEST_KEY))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_per_source_rate_limit_is_429() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let state = WebhookState::new(
        dispatch,
        ack,
        AuthConfig {
            api_key: Some(TEST_KEY.to_string()),
            enable: true,
        },
        coderelay_config::LogConfig::default(),
        2,
    );

    for _ in 0..2 {
        let response = router(state.clone())
            .oneshot(post_request(approve_body("approve_t-1"), Some(TEST_KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router(state)
        .oneshot(post_request(approve_body("approve_t-1"), Some(TEST_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(response).await;
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = dispatch(&dir);
    let ack = Arc::new(FlakyAck {
        calls: AtomicU32::new(0),
        fail: false,
    });
    let app = router(state_with(dispatch, ack, true));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "coderelay-webhook");
}
