//! Request boundary guards shared by all handlers.
//!
//! Each guard encapsulates one cross-cutting policy: cross-origin handling,
//! the CSRF double-submit check and per-client rate limiting. Guards run
//! before any validation or upstream work.

pub mod cors;
pub mod csrf;
pub mod rate_limit;

pub use cors::CorsPolicy;
pub use rate_limit::{RateDecision, RateLimiter};
