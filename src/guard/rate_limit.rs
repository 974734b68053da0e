//! Fixed-window rate limiter keyed by client identity.
//!
//! Counters live in a process-wide [`DashMap`]; increment-then-compare runs
//! under the map's per-key entry lock so concurrent requests for the same
//! identity are counted exactly once each. Stale window buckets are never
//! evicted; unbounded growth is an accepted limitation of the in-memory
//! design. Known weakness of fixed windows: up to 2x the nominal limit can
//! pass across a window boundary.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u64,
}

pub struct RateLimiter {
    window_secs: u64,
    limit: u64,
    buckets: DashMap<(String, u64), u64, ahash::RandomState>,
}

impl RateLimiter {
    pub fn new(window_secs: u64, limit: u64) -> Self {
        Self {
            window_secs: window_secs.max(1),
            limit,
            buckets: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn check(&self, identity: &str) -> RateDecision {
        self.check_at(identity, chrono::Utc::now().timestamp().max(0) as u64)
    }

    /// Deterministic variant used by tests to pin the window.
    pub fn check_at(&self, identity: &str, now_unix: u64) -> RateDecision {
        let window = now_unix / self.window_secs;
        let mut entry = self
            .buckets
            .entry((identity.to_string(), window))
            .or_insert(0);
        *entry += 1;
        let count = *entry;
        drop(entry);

        if count > self.limit {
            RateDecision {
                allowed: false,
                remaining: 0,
            }
        } else {
            RateDecision {
                allowed: true,
                remaining: self.limit - count,
            }
        }
    }
}

/// Derives the client identity for limiting: the first forwarded-for entry,
/// falling back to the peer address, falling back to a sentinel.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}
