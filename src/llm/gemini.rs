use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::utils::http::build_http_client;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeminiImageConfig {
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
}

impl RequestPart {
    pub fn inline_image(mime_type: &str, data: &str) -> Self {
        RequestPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            },
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        RequestPart::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Gemini request failed: {0}")]
    Request(String),
    #[error("Gemini request failed with status {status}: {}", message.as_deref().unwrap_or(body))]
    Status {
        status: u16,
        message: Option<String>,
        body: String,
    },
    #[error("Failed to decode Gemini response: {0}")]
    Decode(String),
}

/// The one capability the studio needs from a generation backend.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn send_generation_request(
        &self,
        api_key: &str,
        model: &str,
        parts: Vec<RequestPart>,
        image_config: &GeminiImageConfig,
    ) -> Result<GeminiResponse, TransportError>;
}

pub fn build_image_config(config: &GeminiImageConfig) -> Option<Value> {
    let mut map = Map::new();

    if let Some(aspect_ratio) = config.aspect_ratio.as_deref() {
        let trimmed = aspect_ratio.trim();
        if !trimmed.is_empty() {
            map.insert("aspectRatio".to_string(), json!(trimmed));
        }
    }

    if let Some(image_size) = config.image_size.as_deref() {
        let trimmed = image_size.trim();
        if !trimmed.is_empty() {
            map.insert("imageSize".to_string(), json!(trimmed));
        }
    }

    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

pub fn build_generate_content_payload(
    parts: &[RequestPart],
    image_config: &GeminiImageConfig,
) -> Value {
    let mut generation_config = json!({
        "responseModalities": ["TEXT", "IMAGE"]
    });
    if let Some(image_config) = build_image_config(image_config) {
        if let Some(config_object) = generation_config.as_object_mut() {
            config_object.insert("imageConfig".to_string(), image_config);
        }
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
    })
}

pub(crate) fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

pub(crate) fn summarize_parts(parts: &[RequestPart]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| match part {
            RequestPart::Text { text } => json!({ "text": truncate_for_log(text, 200) }),
            RequestPart::InlineData { inline_data } => json!({
                "inlineData": {
                    "mimeType": inline_data.mime_type,
                    "dataLen": inline_data.data.len()
                }
            }),
        })
        .collect()
}

fn summarize_gemini_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut text_preview = None;

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    for candidate in candidates {
        let parts = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.as_deref())
            .unwrap_or(&[]);
        for part in parts {
            if let Some(text) = part.text.as_deref() {
                text_parts += 1;
                if text_preview.is_none() && !text.trim().is_empty() {
                    text_preview = Some(truncate_for_log(text, 200));
                }
            }
            if part.inline_data.is_some() {
                image_parts += 1;
            }
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview
    })
}

/// Pulls the backend's own message (and status code name, e.g.
/// `RESOURCE_EXHAUSTED`) out of an error body.
fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        let status = value.pointer("/error/status").and_then(|v| v.as_str());
        let message = match (message, status) {
            (Some(message), Some(status)) if !message.contains(status) => {
                Some(format!("{status}: {message}"))
            }
            (message, _) => message,
        };
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

pub struct GeminiHttpTransport {
    client: Client,
    base_url: String,
}

impl GeminiHttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(GeminiHttpTransport {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.gemini_api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl GenerationTransport for GeminiHttpTransport {
    async fn send_generation_request(
        &self,
        api_key: &str,
        model: &str,
        parts: Vec<RequestPart>,
        image_config: &GeminiImageConfig,
    ) -> Result<GeminiResponse, TransportError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let payload = build_generate_content_payload(&parts, image_config);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let summary = json!({
                "parts": summarize_parts(&parts),
                "generationConfig": payload.get("generationConfig"),
            });
            debug!(target: "llm.gemini", model = model, payload = %summary);
        }

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, status={:?})",
                    err,
                    err.is_timeout(),
                    err.is_connect(),
                    err.status()
                );
                TransportError::Request(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
                body: body_summary,
            });
        }

        let value = response
            .json::<GeminiResponse>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            let response_summary = summarize_gemini_response(&value);
            debug!(target: "llm.gemini", model = model, response = %response_summary);
        }
        Ok(value)
    }
}
