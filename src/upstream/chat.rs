//! Chat completion proxy client for the demo receptionist.

use std::sync::Arc;

use serde_json::json;

use super::{send_with_retry, status_error, Delay, RetryPolicy, UpstreamError};
use crate::validate::ChatMessage;

const CHAT_MODEL: &str = "gpt-4o-mini";
const CHAT_TEMPERATURE: f64 = 0.6;
const FALLBACK_REPLY: &str = "Sorry, I had trouble responding.";

/// Fixed demo persona, optionally extended with a per-business note.
pub fn receptionist_prompt(biz_note: Option<&str>) -> String {
    let mut lines = vec![
        "You are Ava, a friendly, professional front-desk receptionist at BrightSmile Dental Clinic.".to_string(),
        "Location: 215 Maple Ave, Midtown. Hours: Mon-Sat 9am-6pm.".to_string(),
        "Services: cleaning, whitening, exam & x-rays, fillings, crowns, emergency visits.".to_string(),
        "Pricing (ballpark): cleaning $99, whitening add-on $149, exam+xray $129.".to_string(),
        "Style: short, natural (1-2 sentences), helpful, never robotic.".to_string(),
        "If asked to book, collect: full name, phone, email, preferred time. Offer 2-3 options if needed.".to_string(),
        "Avoid medical advice; suggest seeing the dentist for diagnosis.".to_string(),
    ];
    if let Some(note) = biz_note.filter(|n| !n.trim().is_empty()) {
        lines.push(format!("Special note: {}", note));
    }
    lines.join("\n")
}

pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
}

impl ChatClient {
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

    /// Runs one completion and returns the assistant's trimmed reply, or a
    /// canned apology when the provider response carries no usable content.
    pub async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingCredential("OPENAI_API_KEY"))?;

        let mut wire_messages = Vec::with_capacity(messages.len() + 1);
        wire_messages.push(json!({ "role": "system", "content": system_prompt }));
        for m in messages {
            wire_messages.push(json!({ "role": m.role, "content": m.content }));
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        let builder = self.client.post(&url).bearer_auth(api_key).json(&json!({
            "model": CHAT_MODEL,
            "temperature": CHAT_TEMPERATURE,
            "messages": wire_messages,
        }));

        let resp = send_with_retry(&self.policy, self.delay.as_ref(), builder).await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(extract_reply(&body))
    }
}

fn extract_reply(body: &serde_json::Value) -> String {
    let reply = body
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match reply {
        Some(text) => text.to_string(),
        None => FALLBACK_REPLY.to_string(),
    }
}
