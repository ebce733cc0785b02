//! # cap-describer-gemini
//!
//! `Describer` implementation backed by the Gemini `generateContent`
//! endpoint. One outbound JSON-over-HTTPS call per invocation, image
//! bytes inlined as base64; no retries, no local state.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cap_core::error::DescriberError;
use cap_core::models::Caption;
use cap_core::traits::Describer;
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_PROMPT: &str = "Describe this image in detail.";

/// How much of an upstream error body to keep in error summaries.
const ERROR_BODY_LIMIT: usize = 300;

/// Process-wide describer configuration, loaded once at startup and
/// passed in explicitly. Request handling never reads ambient state.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    /// Instruction prompt sent alongside the image. Swap it out to
    /// request captions in a different locale.
    pub prompt: String,
    /// Generation constraints: tunables, not part of the contract.
    /// Low temperature keeps output deterministic-leaning; the token
    /// cap bounds latency and response size.
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            temperature: 0.2,
            max_output_tokens: 512,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct GeminiDescriber {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiDescriber {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Describer for GeminiDescriber {
    async fn describe(&self, bytes: &[u8], mime_type: &str) -> Result<Caption, DescriberError> {
        let body = build_request(&self.config, bytes, mime_type);

        log::debug!(
            "calling Gemini ({} bytes, {mime_type}, model {})",
            bytes.len(),
            self.config.model
        );

        // The key travels as a query parameter; keep it out of logs.
        let url = format!("{}?key={}", self.config.endpoint, self.config.api_key);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DescriberError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DescriberError::Status {
                code: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| DescriberError::Malformed(e.to_string()))?;

        let text = extract_description(parsed)?;
        Ok(Caption {
            text,
            model_id: self.config.model.clone(),
        })
    }
}

fn build_request(config: &GeminiConfig, bytes: &[u8], mime_type: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: Some(config.prompt.clone()),
                    inline_data: None,
                },
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: mime_type.to_string(),
                        data: BASE64.encode(bytes),
                    }),
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        },
    }
}

/// Walks the nested candidate structure. Every level is optional on the
/// wire; a missing field is a describer failure, never a panic.
fn extract_description(response: GenerateContentResponse) -> Result<String, DescriberError> {
    let text = response
        .candidates
        .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .and_then(|mut p| if p.is_empty() { None } else { Some(p.remove(0)) })
        .and_then(|part| part.text)
        .ok_or_else(|| DescriberError::Malformed("no candidate text in response".into()))?;

    if text.trim().is_empty() {
        return Err(DescriberError::EmptyDescription);
    }
    Ok(text)
}

fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        s.to_string()
    } else {
        let mut end = limit;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<ResponseCandidate>>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_prompt_inline_image_and_constraints() {
        let config = GeminiConfig::new("k");
        let body = build_request(&config, b"\xFF\xD8\xFF", "image/jpeg");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], DEFAULT_PROMPT);
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/jpeg"
        );
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["data"],
            BASE64.encode(b"\xFF\xD8\xFF")
        );
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
        // The prompt part must not also carry image data, and vice versa.
        assert!(json["contents"][0]["parts"][0].get("inline_data").is_none());
        assert!(json["contents"][0]["parts"][1].get("text").is_none());
    }

    #[test]
    fn extracts_first_candidate_text() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"A red bicycle."}]},
                "finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_description(response).unwrap(), "A red bicycle.");
    }

    #[test]
    fn missing_candidates_is_malformed_not_a_panic() {
        for body in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{}}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{}]}}]}"#,
        ] {
            let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
            assert!(matches!(
                extract_description(response),
                Err(DescriberError::Malformed(_))
            ));
        }
    }

    #[test]
    fn blank_candidate_text_is_empty_description() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#)
                .unwrap();
        assert!(matches!(
            extract_description(response),
            Err(DescriberError::EmptyDescription)
        ));
    }

    #[test]
    fn error_bodies_are_truncated_for_summaries() {
        let long = "x".repeat(1000);
        assert!(truncate(&long, ERROR_BODY_LIMIT).len() < long.len());
        assert_eq!(truncate("short", ERROR_BODY_LIMIT), "short");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let mut config = GeminiConfig::new("k");
        // Reserved TEST-NET-1 address; nothing listens there.
        config.endpoint = "http://192.0.2.1:9/v1beta/models/x:generateContent".into();
        config.timeout = Duration::from_millis(200);

        let describer = GeminiDescriber::new(config).unwrap();
        let result = describer.describe(b"abc", "image/png").await;
        assert!(matches!(result, Err(DescriberError::Transport(_))));
    }
}
