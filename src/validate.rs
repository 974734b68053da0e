//! Request payload schemas and validation.
//!
//! Every field of an untrusted payload is checked against fixed bounds before
//! use; the first violated constraint is reported. Lengths count Unicode
//! characters, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::inject::PlaceholderMap;

/// Single supported config schema version.
pub const CONFIG_VERSION: u32 = 1;
pub const MAX_TTS_TEXT_CHARS: usize = 1000;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("identifier regex"));

/// Business persona configuration, constructed per-request from untrusted
/// input and immutable once validated. Never persisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessConfig {
    pub version: u32,
    pub biz_name: String,
    pub receptionist_name: String,
    pub timezone: String,
    pub calendar_id: String,
    pub email: String,
}

impl BusinessConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.version != CONFIG_VERSION {
            return Err(format!("Unsupported config version: {}", self.version));
        }
        check_len("bizName", &self.biz_name, 2, 80)?;
        check_len("receptionistName", &self.receptionist_name, 2, 40)?;
        check_len("timezone", &self.timezone, 3, 60)?;
        check_len("calendarId", &self.calendar_id, 3, 200)?;
        if !EMAIL_RE.is_match(&self.email) {
            return Err("email must be a valid email address".to_string());
        }
        Ok(())
    }

    /// The canonical placeholder tokens injected into graph templates.
    pub fn placeholder_map(&self) -> PlaceholderMap {
        vec![
            ("bizName".to_string(), self.biz_name.clone()),
            (
                "receptionistName".to_string(),
                self.receptionist_name.clone(),
            ),
            ("timezone".to_string(), self.timezone.clone()),
            ("calendarId".to_string(), self.calendar_id.clone()),
            ("email".to_string(), self.email.clone()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateFlowsRequest {
    pub cfg: BusinessConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub voice_settings: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TtsRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_len("text", &self.text, 1, MAX_TTS_TEXT_CHARS)?;
        // Identifiers end up in the upstream URL path; restrict the charset
        // so no escaping is needed.
        for (name, value) in [("voice_id", &self.voice_id), ("model_id", &self.model_id)] {
            if let Some(value) = value {
                if !IDENTIFIER_RE.is_match(value) {
                    return Err(format!(
                        "{} must be 1-64 characters of [A-Za-z0-9_-]",
                        name
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BizNote {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub biz: Option<BizNote>,
}

impl DemoChatRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.messages.is_empty() || self.messages.len() > 50 {
            return Err("messages must contain between 1 and 50 entries".to_string());
        }
        for message in &self.messages {
            if message.role != "user" && message.role != "assistant" {
                return Err(format!("unsupported message role: {}", message.role));
            }
            check_len("message content", &message.content, 1, 2000)?;
        }
        if let Some(note) = self.biz.as_ref().and_then(|b| b.note.as_deref()) {
            if note.chars().count() > 500 {
                return Err("biz.note must be at most 500 characters".to_string());
            }
        }
        Ok(())
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(format!(
            "{} must be between {} and {} characters",
            field, min, max
        ));
    }
    Ok(())
}
