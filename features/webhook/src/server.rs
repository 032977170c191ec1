//! The inbound webhook listener.
//!
//! One POST endpoint accepts approval callbacks, persists them, schedules
//! a best-effort chat acknowledgement and fans a notification out to
//! subscribed sessions. Validation failures answer 4xx with a stable
//! code; only unrecoverable internal faults answer 500.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response as HttpResponse;
use axum::routing::get;
use axum::routing::post;
use chrono::Utc;
use coderelay_config::AuthConfig;
use coderelay_config::LogConfig;
use coderelay_dispatch::DispatchPipeline;
use coderelay_protocol::Response;

use crate::payload::CallbackPayload;
use crate::payload::CallbackReply;
use crate::payload::ErrorReply;
use crate::payload::HealthReply;
use crate::rate::SourceRateLimiter;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Chat-side acknowledgement sender.
///
/// Failures are logged and never fail the webhook request.
#[async_trait]
pub trait ChatAcknowledger: Send + Sync {
    /// Acknowledge a response back into the chat.
    async fn acknowledge(&self, response: &Response) -> Result<(), String>;
}

/// Acknowledger that routes a confirmation message through dispatch.
pub struct DispatchAcknowledger {
    dispatch: Arc<DispatchPipeline>,
}

impl DispatchAcknowledger {
    /// Create an acknowledger over the pipeline.
    pub fn new(dispatch: Arc<DispatchPipeline>) -> Self {
        Self { dispatch }
    }
}

#[async_trait]
impl ChatAcknowledger for DispatchAcknowledger {
    async fn acknowledge(&self, response: &Response) -> Result<(), String> {
        self.dispatch
            .send_message(
                format!(
                    "Response received: {} for task {}",
                    response.action, response.task_id
                ),
                "webhook",
            )
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Shared state behind the router.
pub struct WebhookState {
    dispatch: Arc<DispatchPipeline>,
    acknowledger: Arc<dyn ChatAcknowledger>,
    auth: AuthConfig,
    log: LogConfig,
    limiter: SourceRateLimiter,
    started: Instant,
}

impl WebhookState {
    /// Assemble webhook state.
    pub fn new(
        dispatch: Arc<DispatchPipeline>,
        acknowledger: Arc<dyn ChatAcknowledger>,
        auth: AuthConfig,
        log: LogConfig,
        requests_per_minute: u32,
    ) -> Arc<Self> {
        Arc::new(Self {
            dispatch,
            acknowledger,
            auth,
            log,
            limiter: SourceRateLimiter::per_minute(requests_per_minute),
            started: Instant::now(),
        })
    }
}

/// Build the webhook router.
pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/bridge-response", post(bridge_response))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    bind: &str,
    state: Arc<WebhookState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(bind, "webhook listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health(State(state): State<Arc<WebhookState>>) -> Json<HealthReply> {
    Json(HealthReply {
        status: "healthy".to_string(),
        service: "coderelay-webhook".to_string(),
        timestamp: Utc::now(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

async fn bridge_response(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Result<Json<CallbackPayload>, axum::extract::rejection::JsonRejection>,
) -> HttpResponse {
    let started = Instant::now();

    if let Err(reply) = check_auth(&state.auth, &headers) {
        return reply;
    }

    let Json(payload) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return error_reply(
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                rejection.body_text(),
            );
        }
    };

    if payload.payload_type != "telegram_response" {
        return error_reply(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            format!("unsupported payload type: {}", payload.payload_type),
        );
    }

    // Per-source limit keyed by user id.
    if !state.limiter.allow(&payload.user_id.to_string()) {
        return error_reply(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "too many requests from this source",
        );
    }

    if let Ok(raw) = serde_json::to_value(&payload) {
        tracing::debug!(
            payload = %coderelay_config::redacted(&raw, &state.log.redact_keys),
            "callback payload"
        );
    }

    let correlation_id = payload
        .correlation_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut response = Response::from_callback(
        payload.callback_data.clone(),
        payload.user_id,
        payload.timestamp,
    )
    .with_user(payload.username.clone(), payload.first_name.clone())
    .with_correlation_id(correlation_id.clone());
    let action = response.action;
    let task_id = response.task_id.clone();

    tracing::info!(
        correlation_id = %correlation_id,
        action = %action,
        task_id = %task_id,
        user_id = payload.user_id,
        "callback received"
    );

    // Chat acknowledgement is best-effort: log failures, keep the 200.
    let mut acknowledgement_sent = false;
    if action.wants_ack() {
        match state.acknowledger.acknowledge(&response).await {
            Ok(()) => acknowledgement_sent = true,
            Err(e) => {
                tracing::warn!(correlation_id = %correlation_id, error = %e, "chat acknowledgement failed");
            }
        }
    }

    // Persist and fan out; this is the only unrecoverable path.
    response.correlation_id = Some(correlation_id.clone());
    if let Err(e) = state.dispatch.accept_response(response) {
        tracing::error!(correlation_id = %correlation_id, error = %e, "failed to record response");
        return error_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "PROCESSING_ERROR",
            "failed to record response",
        );
    }

    let reply = CallbackReply {
        success: true,
        correlation_id,
        action: action.to_string(),
        task_id,
        acknowledgement_sent,
        processing_ms: started.elapsed().as_millis() as u64,
    };
    (StatusCode::OK, Json(reply)).into_response()
}

fn check_auth(auth: &AuthConfig, headers: &HeaderMap) -> Result<(), HttpResponse> {
    if !auth.enable {
        return Ok(());
    }
    let expected = auth.api_key.as_deref().unwrap_or("");
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    match presented {
        None => Err(error_reply(
            StatusCode::UNAUTHORIZED,
            "AUTH_HEADER_NOT_FOUND",
            "missing api key header",
        )),
        Some(key) if key != expected => Err(error_reply(
            StatusCode::UNAUTHORIZED,
            "AUTHENTICATION_FAILED",
            "invalid api key",
        )),
        Some(_) => Ok(()),
    }
}

fn error_reply(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> HttpResponse {
    (status, Json(ErrorReply::new(code, message))).into_response()
}

#[cfg(test)]
#[path = "server.test.rs"]
mod tests;
