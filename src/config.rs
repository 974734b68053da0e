use std::env;

use anyhow::{anyhow, Result};

pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 60;
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 65_536;
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_UPSTREAM_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_UPSTREAM_RETRY_BASE_MS: u64 = 250;
pub const DEFAULT_SPEECH_API_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_CHAT_API_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cors_allow_origins: Vec<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: u64,
    pub require_csrf: bool,
    pub max_request_bytes: usize,
    /// Absent keys are not a startup error; the affected endpoint fails
    /// per-request with a CONFIG envelope instead.
    pub elevenlabs_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub speech_api_url: String,
    pub chat_api_url: String,
    pub upstream_timeout_ms: u64,
    pub upstream_retry_attempts: u32,
    pub upstream_retry_base_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let rate_limit_window_secs = parse_optional_u64("RATE_LIMIT_WINDOW_SECS")?
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS)
            .max(1);
        let rate_limit_max_requests = parse_optional_u64("RATE_LIMIT_MAX_REQUESTS")?
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);
        let require_csrf = parse_bool_env("REQUIRE_CSRF")?.unwrap_or(false);
        let max_request_bytes = parse_optional_u64("MAX_REQUEST_BYTES")?
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_REQUEST_BYTES);

        let elevenlabs_api_key = non_empty_var("ELEVENLABS_API_KEY");
        let openai_api_key = non_empty_var("OPENAI_API_KEY");
        let speech_api_url =
            non_empty_var("SPEECH_API_URL").unwrap_or_else(|| DEFAULT_SPEECH_API_URL.to_string());
        let chat_api_url =
            non_empty_var("CHAT_API_URL").unwrap_or_else(|| DEFAULT_CHAT_API_URL.to_string());

        let upstream_timeout_ms =
            parse_optional_u64("UPSTREAM_TIMEOUT_MS")?.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_MS);
        let upstream_retry_attempts = parse_optional_u64("UPSTREAM_RETRY_ATTEMPTS")?
            .map(|v| v as u32)
            .unwrap_or(DEFAULT_UPSTREAM_RETRY_ATTEMPTS)
            .max(1);
        let upstream_retry_base_ms =
            parse_optional_u64("UPSTREAM_RETRY_BASE_MS")?.unwrap_or(DEFAULT_UPSTREAM_RETRY_BASE_MS);

        Ok(Self {
            cors_allow_origins,
            rate_limit_window_secs,
            rate_limit_max_requests,
            require_csrf,
            max_request_bytes,
            elevenlabs_api_key,
            openai_api_key,
            speech_api_url,
            chat_api_url,
            upstream_timeout_ms,
            upstream_retry_attempts,
            upstream_retry_base_ms,
        })
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
