//! Speech synthesis proxy client.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;

use super::{send_with_retry, status_error, Delay, RetryPolicy, UpstreamError};
use crate::validate::TtsRequest;

pub const DEFAULT_VOICE_ID: &str = "uju3wxzG5OhpWcoi3SMy";
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
const DEFAULT_STABILITY: f64 = 0.5;
const DEFAULT_SIMILARITY_BOOST: f64 = 0.7;

pub struct SpeechClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
}

impl SpeechClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        policy: RetryPolicy,
        delay: Arc<dyn Delay>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            policy,
            delay,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Synthesizes the request text and returns the raw MP3 bytes.
    /// Fails before any network call when the credential is absent.
    pub async fn synthesize(&self, req: &TtsRequest) -> Result<Bytes, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingCredential("ELEVENLABS_API_KEY"))?;

        let voice_id = req.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID);
        let model_id = req.model_id.as_deref().unwrap_or(DEFAULT_MODEL_ID);
        let settings = req.voice_settings.as_ref();
        let stability = settings
            .and_then(|s| s.get("stability"))
            .and_then(|v| v.as_f64())
            .unwrap_or(DEFAULT_STABILITY);
        let similarity_boost = settings
            .and_then(|s| s.get("similarity_boost"))
            .and_then(|v| v.as_f64())
            .unwrap_or(DEFAULT_SIMILARITY_BOOST);

        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice_id);
        let builder = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header("accept", "audio/mpeg")
            .json(&json!({
                "model_id": model_id,
                "text": req.text,
                "voice_settings": {
                    "stability": stability,
                    "similarity_boost": similarity_boost,
                }
            }));

        let resp = send_with_retry(&self.policy, self.delay.as_ref(), builder).await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        resp.bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))
    }
}
