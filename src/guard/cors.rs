//! Cross-origin policy guard.
//!
//! Applied as an outermost middleware layer so preflight requests are
//! short-circuited before routing, body limits or any handler logic. CORS is
//! a browser enforcement mechanism, not server authorization: a disallowed
//! origin gets no allow-origin header but the request is still processed.

use std::collections::HashSet;

use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, ORIGIN, VARY};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::AppState;

const ALLOW_METHODS: &str = "POST,GET,OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, X-CSRF-Token";

/// Exact-match allow-list of origins, built once from configuration.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allow_origins: HashSet<String>,
}

impl CorsPolicy {
    pub fn new(allow_origins: impl IntoIterator<Item = String>) -> Self {
        Self {
            allow_origins: allow_origins.into_iter().collect(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allow_origins.contains(origin)
    }
}

/// Middleware entry point. Answers `OPTIONS` immediately with 204 and no
/// body; otherwise runs the inner service and decorates its response.
pub async fn cors_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let echo_origin = allowed_origin(&state.cors, req.headers());
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        apply_headers(resp.headers_mut(), echo_origin.as_ref());
        return resp;
    }
    let mut resp = next.run(req).await;
    apply_headers(resp.headers_mut(), echo_origin.as_ref());
    resp
}

fn allowed_origin(policy: &CorsPolicy, headers: &HeaderMap) -> Option<HeaderValue> {
    let origin = headers.get(ORIGIN)?.to_str().ok()?;
    if policy.allows(origin) {
        headers.get(ORIGIN).cloned()
    } else {
        tracing::debug!(origin, "origin not in allow-list; no CORS headers added");
        None
    }
}

fn apply_headers(headers: &mut HeaderMap, echo_origin: Option<&HeaderValue>) {
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    if let Some(origin) = echo_origin {
        headers.insert("access-control-allow-origin", origin.clone());
        // Required for correct caching: without it a shared cache could serve
        // one origin's permission to another.
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
}
