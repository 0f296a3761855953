use super::{ChatMessage, LlmError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_response_mime_type() -> String {
    "text/plain".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_response_mime_type")]
    pub response_mime_type: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            response_mime_type: default_response_mime_type(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("response_mime_type", &self.response_mime_type)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiConfig {
    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

/// `generateContent` response. Every level is optional; a missing level reads
/// as "no text".
#[derive(Debug, Default, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    /// Parse a response body. Bodies that are JSON but not shaped like a
    /// response yield an empty response.
    pub fn from_body(body: &[u8]) -> Result<Self, LlmError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| LlmError::Parse(format!("response is not JSON: {}", e)))?;
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            debug!(error = %e, "unexpected generateContent response shape");
            GeminiResponse::default()
        }))
    }

    /// `candidates[0].content.parts[0].text`, trimmed; `None` if absent or blank.
    pub fn first_text(&self) -> Option<String> {
        let text = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()?
            .trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

fn build_request<'a>(config: &'a GeminiConfig, messages: &[ChatMessage]) -> GeminiRequest<'a> {
    let contents = messages
        .iter()
        .map(|m| GeminiContent {
            role: Some(m.role.as_str().to_string()),
            parts: vec![GeminiPart {
                text: Some(m.content.clone()),
            }],
        })
        .collect();

    GeminiRequest {
        contents,
        generation_config: GenerationConfig {
            response_mime_type: &config.response_mime_type,
        },
    }
}

pub async fn chat(
    client: &Client,
    config: &GeminiConfig,
    messages: &[ChatMessage],
) -> Result<GeminiResponse, LlmError> {
    let body = build_request(config, messages);

    // The key travels in the query string, so strip URLs from transport errors.
    let resp = client
        .post(config.endpoint())
        .query(&[("key", config.api_key.as_str())])
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| LlmError::Http(e.without_url()))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status,
            message: text,
        });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| LlmError::Http(e.without_url()))?;
    GeminiResponse::from_body(&bytes)
}
