//! Core library for Frontdesk.  This module wires together the boundary
//! guards, request schemas and HTTP handlers for the AI receptionist
//! configurator API.  Handlers stay thin: guards run first, payloads are
//! validated against fixed schemas, and all non-trivial work is either
//! placeholder injection over bundled templates or a retrying call to a
//! third-party API.

mod config;
pub mod guard;
pub mod inject;
pub mod respond;
pub mod templates;
pub mod upstream;
pub mod validate;

pub use config::AppConfig;
pub use guard::{CorsPolicy, RateDecision, RateLimiter};
pub use inject::{Injector, PlaceholderMap};
pub use respond::{ApiError, ErrorKind};
pub use upstream::{ChatClient, Delay, RetryPolicy, SpeechClient, TokioDelay, UpstreamError};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{
    rejection::{BytesRejection, FailedToBufferBody, JsonRejection},
    ConnectInfo, DefaultBodyLimit, State,
};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

use crate::guard::rate_limit::client_identity;
use crate::guard::{cors, csrf};
use crate::upstream::chat::receptionist_prompt;
use crate::validate::{DemoChatRequest, GenerateFlowsRequest, TtsRequest};

/// Internal application state shared across handlers.  Built once at process
/// start and handed by reference into every request; the rate limiter map is
/// the only mutable piece.
#[derive(Clone)]
pub struct AppState {
    pub cors: Arc<CorsPolicy>,
    pub limiter: Arc<RateLimiter>,
    pub require_csrf: bool,
    /// Maximum accepted raw request body size in bytes.
    pub max_request_bytes: usize,
    pub speech: Arc<SpeechClient>,
    pub chat: Arc<ChatClient>,
}

/// Build state from environment variables.  See `AppConfig::from_env` for
/// the complete list of recognized variables.
pub async fn build_state_from_env() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    Ok(build_state(config))
}

pub fn build_state(config: AppConfig) -> AppState {
    let cors = Arc::new(CorsPolicy::new(config.cors_allow_origins.clone()));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_window_secs,
        config.rate_limit_max_requests,
    ));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.upstream_timeout_ms))
        .build()
        .expect("failed to build reqwest client");
    let policy = RetryPolicy::new(
        config.upstream_retry_attempts,
        Duration::from_millis(config.upstream_retry_base_ms),
    );
    let delay: Arc<dyn Delay> = Arc::new(TokioDelay);

    let speech = Arc::new(SpeechClient::new(
        client.clone(),
        config.speech_api_url.clone(),
        config.elevenlabs_api_key.clone(),
        policy.clone(),
        delay.clone(),
    ));
    let chat = Arc::new(ChatClient::new(
        client,
        config.chat_api_url.clone(),
        config.openai_api_key.clone(),
        policy,
        delay,
    ));
    if !speech.is_configured() {
        tracing::warn!("ELEVENLABS_API_KEY not set; /tts will answer with CONFIG errors");
    }
    if !chat.is_configured() {
        tracing::warn!("OPENAI_API_KEY not set; /demo-chat will answer with CONFIG errors");
    }

    AppState {
        cors,
        limiter,
        require_csrf: config.require_csrf,
        max_request_bytes: config.max_request_bytes,
        speech,
        chat,
    }
}

/// Build the Axum router and attach handlers.  The CORS guard is the
/// outermost layer so preflight requests short-circuit before routing and
/// body limits; the catch-panic layer converts any unanticipated failure
/// into an EXCEPTION envelope instead of a raw protocol error.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/csrf", get(csrf_handler).fallback(method_fallback))
        .route(
            "/generate-flows",
            post(generate_flows_handler).fallback(method_fallback),
        )
        .route("/tts", post(tts_handler).fallback(method_fallback))
        .route(
            "/demo-chat",
            post(demo_chat_handler).fallback(method_fallback),
        )
        .route("/voices", get(voices_handler).fallback(method_fallback))
        .route("/healthz", get(healthz_handler).fallback(method_fallback))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(state.max_request_bytes))
        .layer(CatchPanicLayer::custom(panic_envelope))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cors::cors_layer,
        ))
        .with_state(state)
}

/// Rate limit then (when enforced) the CSRF double-submit check.  Runs
/// before any payload parsing or upstream work.
fn enforce_boundary(
    state: &AppState,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> Result<(), ApiError> {
    let identity = client_identity(headers, peer);
    let decision = state.limiter.check(&identity);
    if !decision.allowed {
        tracing::warn!(%identity, "rate limit exceeded");
        return Err(ApiError::rate_limited());
    }
    tracing::debug!(%identity, remaining = decision.remaining, "rate limit ok");
    if state.require_csrf && !csrf::verify(headers) {
        tracing::info!(%identity, "csrf double-submit check failed");
        return Err(ApiError::csrf());
    }
    Ok(())
}

fn handle_json_rejection(state: &AppState, rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::BytesRejection(BytesRejection::FailedToBufferBody(
            FailedToBufferBody::LengthLimitError(_),
        )) => {
            tracing::warn!(
                limit = state.max_request_bytes,
                "request body exceeded configured limit"
            );
            ApiError::too_large(state.max_request_bytes)
        }
        other => ApiError::validation(other.body_text()),
    }
}

async fn method_fallback() -> ApiError {
    ApiError::method()
}

async fn not_found_handler() -> ApiError {
    ApiError::new(ErrorKind::Unknown, "Not found", StatusCode::NOT_FOUND)
}

fn panic_envelope(err: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(%detail, "handler panicked");
    ApiError::exception("Internal server error").into_response()
}

/// `GET /csrf`: issues a fresh double-submit token.  The cookie carries the
/// HttpOnly copy; the body returns the raw token for replay in the
/// `X-CSRF-Token` header on mutating requests.
async fn csrf_handler() -> impl IntoResponse {
    let (token, cookie) = csrf::issue();
    (
        [(header::SET_COOKIE, cookie)],
        respond::ok(json!({ "token": token })),
    )
}

/// `POST /generate-flows`: validates the business config and returns both
/// automation graph documents with placeholders injected.
async fn generate_flows_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<GenerateFlowsRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    enforce_boundary(&state, &headers, connect_info.map(|ConnectInfo(a)| a))?;
    let Json(req) = payload.map_err(|r| handle_json_rejection(&state, r))?;
    req.cfg.validate().map_err(ApiError::validation)?;

    let injector = Injector::new(&req.cfg.placeholder_map());
    let check_availability = injector.inject(templates::check_availability());
    let book_appointment = injector.inject(templates::book_appointment());
    tracing::debug!(biz = %req.cfg.biz_name, "generated workflow documents");

    Ok(respond::ok(json!({
        "checkAvailability": check_availability,
        "bookAppointment": book_appointment,
    })))
}

/// `POST /tts`: proxies speech synthesis.  Success is the one deliberate
/// exception to the JSON envelope: the raw MP3 bytes are relayed with
/// `audio/mpeg` and `Cache-Control: no-store`.  Failures still use the
/// envelope.
async fn tts_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<axum::response::Response, ApiError> {
    enforce_boundary(&state, &headers, connect_info.map(|ConnectInfo(a)| a))?;
    let Json(req) = payload.map_err(|r| handle_json_rejection(&state, r))?;
    req.validate().map_err(ApiError::validation)?;

    let audio = state.speech.synthesize(&req).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        audio,
    )
        .into_response())
}

/// `POST /demo-chat`: runs one turn of the demo receptionist conversation
/// through the chat completion upstream.
async fn demo_chat_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<DemoChatRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    enforce_boundary(&state, &headers, connect_info.map(|ConnectInfo(a)| a))?;
    let Json(req) = payload.map_err(|r| handle_json_rejection(&state, r))?;
    req.validate().map_err(ApiError::validation)?;

    let note = req.biz.as_ref().and_then(|b| b.note.as_deref());
    let prompt = receptionist_prompt(note);
    let reply = state.chat.complete(&prompt, &req.messages).await?;
    Ok(respond::ok(json!({ "reply": reply })))
}

/// `GET /voices`: curated voice list, safe to expose.  Always includes the
/// default entry with an empty id.
async fn voices_handler() -> Json<serde_json::Value> {
    respond::ok(json!({
        "voices": [
            { "id": "", "name": "Default" },
            { "id": "56bWURjYFHyYyVf490Dp", "name": "Emma" },
            { "id": "UgBBYS2sOqTuMpoF3BR0", "name": "Mark" },
        ]
    }))
}

/// `GET /healthz`: readiness probe.  Reports credential presence as
/// booleans only, never key material.
async fn healthz_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    respond::ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "speechConfigured": state.speech.is_configured(),
        "chatConfigured": state.chat.is_configured(),
    }))
}
