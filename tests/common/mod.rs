use std::collections::HashMap;
use std::net::SocketAddr;

use frontdesk::{app, AppConfig, AppState};
use tokio::task::JoinHandle;

/// A baseline configuration for integration tests: permissive limits, no
/// upstream credentials, upstream URLs pointing nowhere. Tests override the
/// fields they exercise.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        cors_allow_origins: vec!["https://aos-ai.com".to_string()],
        rate_limit_window_secs: 60,
        rate_limit_max_requests: 60,
        require_csrf: false,
        max_request_bytes: 65_536,
        elevenlabs_api_key: None,
        openai_api_key: None,
        speech_api_url: "http://127.0.0.1:1".to_string(),
        chat_api_url: "http://127.0.0.1:1".to_string(),
        upstream_timeout_ms: 2_000,
        upstream_retry_attempts: 3,
        upstream_retry_base_ms: 1,
    }
}

/// Spawns the app on an ephemeral port and returns its base URL. Connect
/// info is wired the same way as in production so the rate limiter sees a
/// peer address.
#[allow(dead_code)]
pub async fn spawn_app(state: AppState) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            app(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (format!("http://{}", addr), handle)
}

/// Tracks environment variable mutations and restores originals on drop.
#[allow(dead_code)]
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.capture(key);
        std::env::set_var(key, value);
    }

    pub fn set_many(&mut self, entries: &[(&str, &str)]) {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.capture(key);
        std::env::remove_var(key);
    }

    fn capture(&mut self, key: &str) {
        if self.originals.contains_key(key) {
            return;
        }
        let original = std::env::var(key).ok();
        self.originals.insert(key.to_string(), original);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}
