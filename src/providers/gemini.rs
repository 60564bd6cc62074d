use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::media::NormalizedMedia;
use crate::providers::http::{join_url, send_json, validate_api_key};
use crate::providers::traits::{ChatProvider, ChatRequest, ContentAdapter, ProviderId};

/// Gemini client for the Google AI generateContent API
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        max_tokens: u32,
    ) -> Result<Self> {
        validate_api_key(ProviderId::Gemini, &api_key)?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            max_tokens,
        })
    }

    fn build_model_url(&self) -> String {
        join_url(
            &self.base_url,
            &format!("/v1beta/models/{}:generateContent", self.model),
        )
    }

    pub(crate) fn build_request(&self, request: &ChatRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: self.user_parts(request),
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let url = self.build_model_url();
        let api_request = self.build_request(request);

        debug!(model = %self.model, "Sending generateContent request");

        let api_response: GeminiResponse = send_json(
            self.id(),
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&api_request),
        )
        .await?;

        api_response.into_text()
    }
}

impl ContentAdapter for GeminiProvider {
    type Part = GeminiPart;

    fn text_part(&self, text: &str) -> GeminiPart {
        GeminiPart::Text {
            text: text.to_string(),
        }
    }

    fn media_part(&self, media: &NormalizedMedia) -> GeminiPart {
        GeminiPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: media.mime_type().to_string(),
                data: media.base64().to_string(),
            },
        }
    }
}

// Gemini API types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
pub(crate) struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Text parts of the first candidate, concatenated.
    pub(crate) fn into_text(self) -> Result<String> {
        let parts = self
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default();

        let texts: Vec<String> = parts.into_iter().filter_map(|part| part.text).collect();
        if texts.is_empty() {
            return Err(RelayError::ProviderResponse {
                provider: ProviderId::Gemini.to_string(),
                reason: "response has no text parts".to_string(),
            });
        }

        Ok(texts.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::normalize;
    use serde_json::json;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            "AIza-test".to_string(),
            "gemini-1.5-flash".to_string(),
            None,
            256,
        )
        .unwrap()
    }

    #[test]
    fn test_model_url() {
        assert_eq!(
            provider().build_model_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_with_inline_data() {
        let request = ChatRequest {
            prompt: Some("Describe this logo".to_string()),
            media: Some(normalize(b"hello".to_vec(), "image/png")),
        };
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "Describe this logo"},
                        {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
                    ]
                }],
                "generationConfig": {"maxOutputTokens": 256}
            })
        );
    }

    #[test]
    fn test_media_only_request_has_no_text_part() {
        let request = ChatRequest {
            prompt: None,
            media: Some(normalize(vec![1], "image/jpeg")),
        };
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].get("inlineData").is_some());
    }

    #[test]
    fn test_concatenates_text_parts() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "Hello, world");
    }

    #[test]
    fn test_blocked_response_is_an_error() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(response.into_text().is_err());
    }
}
